//! Derived-asset (thumbnail) pipeline configuration.

use serde::{Deserialize, Serialize};

/// Thumbnail generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    /// Cache root; thumbnails land at `<root>/<user id>/<file id>.jpg`.
    #[serde(default = "default_root")]
    pub root: String,
    /// Edge length of the square output, in pixels.
    #[serde(default = "default_size")]
    pub size: u32,
    /// JPEG quality (1-100).
    #[serde(default = "default_quality")]
    pub quality: u8,
    /// Relative position in a video to grab the frame from (0.0-1.0).
    #[serde(default = "default_frame_position")]
    pub frame_position: f64,
    /// Concurrent transcodes per batch call.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Path to the `ffmpeg` binary.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,
    /// Path to the `ffprobe` binary.
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,
    /// Upper bound for a single item's transcode, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            size: default_size(),
            quality: default_quality(),
            frame_position: default_frame_position(),
            workers: default_workers(),
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_root() -> String {
    "./data/thumbnails".to_string()
}

fn default_size() -> u32 {
    300
}

fn default_quality() -> u8 {
    80
}

fn default_frame_position() -> f64 {
    0.10
}

fn default_workers() -> usize {
    4
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_timeout() -> u64 {
    60
}
