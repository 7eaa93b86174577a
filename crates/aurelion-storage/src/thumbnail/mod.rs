//! Thumbnail transcoders.
//!
//! Images are decoded in-process with the `image` crate; videos are handed
//! to `ffprobe`/`ffmpeg`. Either way the output is written to a temporary
//! sibling and renamed into place, so a file present at the cache path is
//! always a complete thumbnail.

pub mod error;
pub mod image;
pub mod video;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use aurelion_core::config::ThumbnailConfig;

pub use self::error::TranscodeError;

/// Source families the pipeline knows how to thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// `image/*`
    Image,
    /// `video/*`
    Video,
}

impl MediaKind {
    /// Classify a MIME type; `None` means "produce nothing".
    pub fn from_mime(mime: &str) -> Option<Self> {
        let family = mime.split('/').next()?.trim();
        if family.eq_ignore_ascii_case("image") {
            Some(Self::Image)
        } else if family.eq_ignore_ascii_case("video") {
            Some(Self::Video)
        } else {
            None
        }
    }
}

/// Output parameters shared by every transcoder.
#[derive(Debug, Clone)]
pub struct ThumbnailSpec {
    /// Square edge length in pixels.
    pub size: u32,
    /// JPEG quality (1-100).
    pub quality: u8,
    /// Relative position of the video frame to grab.
    pub frame_position: f64,
    /// `ffmpeg` binary.
    pub ffmpeg_path: String,
    /// `ffprobe` binary.
    pub ffprobe_path: String,
    /// Deadline for one item.
    pub timeout: Duration,
}

impl From<&ThumbnailConfig> for ThumbnailSpec {
    fn from(config: &ThumbnailConfig) -> Self {
        Self {
            size: config.size.max(1),
            quality: config.quality.clamp(1, 100),
            frame_position: config.frame_position.clamp(0.0, 1.0),
            ffmpeg_path: config.ffmpeg_path.clone(),
            ffprobe_path: config.ffprobe_path.clone(),
            timeout: Duration::from_secs(config.timeout_seconds.max(1)),
        }
    }
}

/// Produces a thumbnail file for a source file.
#[async_trait]
pub trait ThumbnailRenderer: Send + Sync + std::fmt::Debug + 'static {
    /// Render `source` of the given kind into `dest`.
    ///
    /// On success `dest` exists and is complete. On failure nothing is left
    /// at `dest`.
    async fn render(&self, kind: MediaKind, source: &Path, dest: &Path)
    -> Result<(), TranscodeError>;
}

/// Default renderer backed by the `image` crate and ffmpeg.
#[derive(Debug, Clone)]
pub struct MediaTranscoder {
    spec: ThumbnailSpec,
}

impl MediaTranscoder {
    /// Create a transcoder with the given output parameters.
    pub fn new(spec: ThumbnailSpec) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl ThumbnailRenderer for MediaTranscoder {
    async fn render(
        &self,
        kind: MediaKind,
        source: &Path,
        dest: &Path,
    ) -> Result<(), TranscodeError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staging = staging_path(dest);

        let rendered = match kind {
            MediaKind::Image => {
                // Dropping this future cancels the blocking render at its next step.
                let cancel = CancellationToken::new();
                let _abort_on_drop = cancel.clone().drop_guard();
                let (source, staging, spec) =
                    (source.to_path_buf(), staging.clone(), self.spec.clone());
                tokio::task::spawn_blocking(move || {
                    image::render(&source, &staging, &spec, &cancel)
                })
                .await
                .map_err(|e| TranscodeError::Aborted(e.to_string()))?
            }
            MediaKind::Video => video::render(source, &staging, &self.spec).await,
        };

        if let Err(e) = rendered {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e);
        }
        if !tokio::fs::try_exists(&staging).await? {
            return Err(TranscodeError::OutputMissing);
        }
        if let Err(e) = tokio::fs::rename(&staging, dest).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }

        debug!(?kind, dest = %dest.display(), "Rendered thumbnail");
        Ok(())
    }
}

/// Temporary sibling for a thumbnail; keeps the `.jpg` suffix so ffmpeg
/// infers the right muxer.
fn staging_path(dest: &Path) -> PathBuf {
    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(
        ".{stem}.{}.partial.jpg",
        uuid::Uuid::new_v4().simple()
    ))
}
