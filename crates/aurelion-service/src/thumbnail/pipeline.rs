//! Thumbnail derivation and batch archive assembly.
//!
//! A batch call fans the requested files out over a [`BoundedPool`] local to
//! that call. Each item settles independently into a [`ThumbnailOutcome`].
//! Ready thumbnails are forwarded to an [`ArchiveStream`] as they finish;
//! the archive is only opened once the first one exists, so a batch with
//! nothing to show fails with `NoDerivableAssets` instead of producing an
//! empty zip. When the consumer drops the archive, the shared cancellation
//! token stops the dispatcher, which drops the pool and with it every
//! in-flight render (ffmpeg children are killed on drop).

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use aurelion_core::error::AppError;
use aurelion_core::result::AppResult;
use aurelion_core::traits::StorageProvider;
use aurelion_core::types::{ContentHash, UserId};
use aurelion_database::FileRepository;
use aurelion_entity::file::File;
use aurelion_storage::archive::{ArchiveEntry, ArchiveStream};
use aurelion_storage::layout::{archive_entry_name, content_path, thumbnail_path};
use aurelion_storage::thumbnail::{MediaKind, ThumbnailRenderer};

use super::pool::BoundedPool;
use crate::context::RequestContext;
use crate::ownership::OwnershipGuard;

/// How one item of a batch settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailOutcome {
    /// A complete thumbnail exists at `path`.
    Ready {
        file_id: ContentHash,
        path: PathBuf,
        cached: bool,
    },
    /// The MIME family has no thumbnail form.
    Skipped { file_id: ContentHash },
    /// Rendering failed; siblings are unaffected.
    Failed { file_id: ContentHash, reason: String },
}

/// A single thumbnail and the file it was derived from.
#[derive(Debug, Clone)]
pub struct RenderedThumbnail {
    pub file: File,
    pub data: Bytes,
}

/// Produces one item's thumbnail, reusing the on-disk cache.
#[derive(Clone)]
struct ItemDeriver {
    content: Arc<dyn StorageProvider>,
    thumbnails: Arc<dyn StorageProvider>,
    renderer: Arc<dyn ThumbnailRenderer>,
}

impl ItemDeriver {
    async fn derive(&self, owner: UserId, file_id: ContentHash, mime_type: String) -> ThumbnailOutcome {
        match self.try_derive(owner, &file_id, &mime_type).await {
            Ok(Some((path, cached))) => ThumbnailOutcome::Ready {
                file_id,
                path,
                cached,
            },
            Ok(None) => ThumbnailOutcome::Skipped { file_id },
            Err(e) => ThumbnailOutcome::Failed {
                file_id,
                reason: e.message,
            },
        }
    }

    async fn try_derive(
        &self,
        owner: UserId,
        file_id: &ContentHash,
        mime_type: &str,
    ) -> AppResult<Option<(PathBuf, bool)>> {
        let Some(kind) = MediaKind::from_mime(mime_type) else {
            return Ok(None);
        };

        let thumb = thumbnail_path(owner, file_id);
        let dest = self.thumbnails.resolve(&thumb)?;
        if self.thumbnails.exists(&thumb).await? {
            debug!(user_id = %owner, file_id = %file_id, "Thumbnail cache hit");
            return Ok(Some((dest, true)));
        }

        let source = self.content.resolve(&content_path(owner, file_id))?;
        self.renderer.render(kind, &source, &dest).await?;
        Ok(Some((dest, false)))
    }
}

/// Derives thumbnails for single files and for batches.
pub struct ThumbnailPipeline {
    files: Arc<dyn FileRepository>,
    guard: Arc<OwnershipGuard>,
    deriver: ItemDeriver,
    workers: usize,
}

impl std::fmt::Debug for ThumbnailPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailPipeline")
            .field("workers", &self.workers)
            .finish()
    }
}

impl ThumbnailPipeline {
    /// Creates a new pipeline running `workers` renders per batch.
    pub fn new(
        files: Arc<dyn FileRepository>,
        content: Arc<dyn StorageProvider>,
        thumbnails: Arc<dyn StorageProvider>,
        renderer: Arc<dyn ThumbnailRenderer>,
        guard: Arc<OwnershipGuard>,
        workers: usize,
    ) -> Self {
        Self {
            files,
            guard,
            deriver: ItemDeriver {
                content,
                thumbnails,
                renderer,
            },
            workers: workers.max(1),
        }
    }

    /// Thumbnail of one owned file.
    pub async fn thumbnail(&self, ctx: &RequestContext, raw_id: &str) -> AppResult<RenderedThumbnail> {
        let file = self.owned_file(ctx.user_id, raw_id).await?;

        match self
            .deriver
            .derive(ctx.user_id, file.id.clone(), file.mime_type.clone())
            .await
        {
            ThumbnailOutcome::Ready { .. } => {
                let data = self
                    .deriver
                    .thumbnails
                    .read_bytes(&thumbnail_path(ctx.user_id, &file.id))
                    .await?;
                Ok(RenderedThumbnail { file, data })
            }
            ThumbnailOutcome::Skipped { .. } => Err(AppError::no_derivable_assets(format!(
                "No thumbnail form for {}",
                file.mime_type
            ))),
            ThumbnailOutcome::Failed { reason, .. } => {
                warn!(user_id = %ctx.user_id, file_id = %file.id, reason, "Thumbnail failed");
                Err(AppError::transcode(reason))
            }
        }
    }

    /// Zip of the thumbnails of every requested file that has one.
    ///
    /// Fails with `NotOwned` if any id is not the caller's and with
    /// `NoDerivableAssets` if no item produced a thumbnail.
    pub async fn batch<S: AsRef<str>>(
        &self,
        ctx: &RequestContext,
        raw_ids: &[S],
    ) -> AppResult<ArchiveStream> {
        let owner = ctx.user_id;
        let ids = self.guard.require(owner, raw_ids).await?;

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            let file = self
                .files
                .find_owned(owner, &id)
                .await?
                .ok_or_else(|| AppError::not_owned(format!("File {id} vanished")))?;
            jobs.push((file.id, file.mime_type));
        }
        let requested = jobs.len();

        let cancel = CancellationToken::new();
        let abort_on_return = cancel.clone().drop_guard();
        let (ready_tx, mut ready_rx) = mpsc::channel(requested.max(1));
        tokio::spawn(dispatch(
            self.deriver.clone(),
            owner,
            jobs,
            self.workers,
            ready_tx,
            cancel.clone(),
        ));

        let Some(first) = ready_rx.recv().await else {
            return Err(AppError::no_derivable_assets(format!(
                "None of {requested} requested files produced a thumbnail"
            )));
        };

        let (entry_tx, entry_rx) = mpsc::channel(self.workers);
        entry_tx
            .send(first)
            .await
            .map_err(|_| AppError::internal("Archive entry queue closed"))?;
        let archive = ArchiveStream::spawn(entry_rx, cancel.clone());
        let _ = abort_on_return.disarm();
        tokio::spawn(forward(ready_rx, entry_tx, cancel));

        info!(user_id = %owner, requested, "Streaming thumbnail archive");
        Ok(archive)
    }

    async fn owned_file(&self, owner: UserId, raw_id: &str) -> AppResult<File> {
        let id = self.guard.require_one(owner, raw_id).await?;
        self.files
            .find_owned(owner, &id)
            .await?
            .ok_or_else(|| AppError::not_owned(format!("File {id} vanished")))
    }
}

/// Run every job through a fresh pool, sending each ready thumbnail on.
async fn dispatch(
    deriver: ItemDeriver,
    owner: UserId,
    jobs: Vec<(ContentHash, String)>,
    workers: usize,
    ready: mpsc::Sender<ArchiveEntry>,
    cancel: CancellationToken,
) {
    let mut pool = BoundedPool::new(workers);
    for (file_id, mime_type) in jobs {
        let deriver = deriver.clone();
        pool.spawn(async move { deriver.derive(owner, file_id, mime_type).await });
    }

    let (mut produced, mut skipped, mut failed) = (0usize, 0usize, 0usize);
    loop {
        let settled = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(user_id = %owner, remaining = pool.len(), "Thumbnail batch cancelled");
                return;
            }
            settled = pool.join_next() => settled,
        };
        let Some(settled) = settled else { break };

        match settled {
            Ok(ThumbnailOutcome::Ready { file_id, path, cached }) => {
                debug!(user_id = %owner, file_id = %file_id, cached, "Thumbnail ready");
                produced += 1;
                let entry = ArchiveEntry {
                    name: archive_entry_name(&file_id),
                    path,
                };
                if ready.send(entry).await.is_err() {
                    return;
                }
            }
            Ok(ThumbnailOutcome::Skipped { file_id }) => {
                debug!(user_id = %owner, file_id = %file_id, "No thumbnail form");
                skipped += 1;
            }
            Ok(ThumbnailOutcome::Failed { file_id, reason }) => {
                warn!(user_id = %owner, file_id = %file_id, reason, "Thumbnail failed");
                failed += 1;
            }
            Err(e) => {
                warn!(user_id = %owner, error = %e, "Thumbnail task aborted");
                failed += 1;
            }
        }
    }

    info!(user_id = %owner, produced, skipped, failed, "Thumbnail batch settled");
}

/// Move entries from the dispatcher to the archive writer until either side stops.
async fn forward(
    mut ready: mpsc::Receiver<ArchiveEntry>,
    entries: mpsc::Sender<ArchiveEntry>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return,
            next = ready.recv() => next,
        };
        let Some(entry) = next else { return };
        if entries.send(entry).await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use futures::StreamExt;

    use aurelion_core::config::ThumbnailConfig;
    use aurelion_core::error::ErrorKind;
    use aurelion_database::MemoryDatabase;
    use aurelion_storage::LocalStorageProvider;
    use aurelion_storage::archive::ArchiveState;
    use aurelion_storage::checksum::compute_checksum;
    use aurelion_storage::thumbnail::{MediaTranscoder, ThumbnailSpec, TranscodeError};

    use crate::file::store::{ContentStore, UploadParams};

    /// Writes a marker JPEG, or hangs when the source says so.
    #[derive(Debug, Default)]
    struct FakeRenderer {
        calls: AtomicUsize,
        hung_dropped: Arc<AtomicBool>,
    }

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ThumbnailRenderer for FakeRenderer {
        async fn render(
            &self,
            _kind: MediaKind,
            source: &Path,
            dest: &Path,
        ) -> Result<(), TranscodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let body = tokio::fs::read(source).await?;
            if body.starts_with(b"hang") {
                let _guard = SetOnDrop(self.hung_dropped.clone());
                std::future::pending::<()>().await;
            }
            if body.starts_with(b"corrupt") {
                return Err(TranscodeError::OutputMissing);
            }
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(dest, b"jpeg").await?;
            Ok(())
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        store: ContentStore,
        pipeline: ThumbnailPipeline,
    }

    async fn fixture(renderer: Arc<dyn ThumbnailRenderer>) -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let files: Arc<dyn FileRepository> = Arc::new(MemoryDatabase::new());
        let content = Arc::new(
            LocalStorageProvider::new(dir.path().join("content"))
                .await
                .expect("content root"),
        );
        let thumbs = Arc::new(
            LocalStorageProvider::new(dir.path().join("thumbs"))
                .await
                .expect("thumb root"),
        );
        let guard = Arc::new(OwnershipGuard::new(files.clone()));
        Fixture {
            store: ContentStore::new(
                files.clone(),
                content.clone(),
                thumbs.clone(),
                guard.clone(),
                1 << 22,
            ),
            pipeline: ThumbnailPipeline::new(files, content, thumbs, renderer, guard, 2),
            _dir: dir,
        }
    }

    async fn upload(fx: &Fixture, ctx: &RequestContext, data: Vec<u8>, mime: &str) -> String {
        fx.store
            .store(
                ctx,
                UploadParams {
                    declared_checksum: compute_checksum(&data),
                    data: Bytes::from(data),
                    filename: "item".to_string(),
                    mime_type: mime.to_string(),
                    creation_date: Utc::now(),
                },
            )
            .await
            .expect("upload")
            .id
            .to_string()
    }

    async fn collect(mut archive: ArchiveStream) -> zip::ZipArchive<Cursor<Vec<u8>>> {
        let mut out = Vec::new();
        while let Some(chunk) = archive.next().await {
            out.extend_from_slice(&chunk.expect("chunk"));
        }
        zip::ZipArchive::new(Cursor::new(out)).expect("valid zip")
    }

    #[tokio::test]
    async fn test_unsupported_mime_is_left_out_of_archive() {
        let fx = fixture(Arc::new(FakeRenderer::default())).await;
        let ctx = RequestContext::for_user(UserId::new());
        let a = upload(&fx, &ctx, b"photo a".to_vec(), "image/png").await;
        let b = upload(&fx, &ctx, b"clip b".to_vec(), "video/mp4").await;
        let c = upload(&fx, &ctx, b"paper c".to_vec(), "application/pdf").await;

        let archive = fx.pipeline.batch(&ctx, &[&a, &b, &c]).await.expect("batch");
        let zip = collect(archive).await;

        assert_eq!(zip.len(), 2);
        let mut names: Vec<&str> = zip.file_names().collect();
        names.sort_unstable();
        let mut expected = vec![format!("{a}.jpg"), format!("{b}.jpg")];
        expected.sort_unstable();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_only_unsupported_is_no_derivable_assets() {
        let fx = fixture(Arc::new(FakeRenderer::default())).await;
        let ctx = RequestContext::for_user(UserId::new());
        let pdf = upload(&fx, &ctx, b"paper".to_vec(), "application/pdf").await;

        let err = fx.pipeline.batch(&ctx, &[&pdf]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoDerivableAssets);
    }

    #[tokio::test]
    async fn test_failed_item_does_not_sink_batch() {
        let fx = fixture(Arc::new(FakeRenderer::default())).await;
        let ctx = RequestContext::for_user(UserId::new());
        let good = upload(&fx, &ctx, b"fine".to_vec(), "image/jpeg").await;
        let bad = upload(&fx, &ctx, b"corrupt bytes".to_vec(), "image/jpeg").await;

        let zip = collect(fx.pipeline.batch(&ctx, &[&good, &bad]).await.expect("batch")).await;
        assert_eq!(zip.len(), 1);
        assert_eq!(zip.file_names().next(), Some(format!("{good}.jpg").as_str()));
    }

    #[tokio::test]
    async fn test_foreign_id_rejects_whole_batch() {
        let fx = fixture(Arc::new(FakeRenderer::default())).await;
        let (alice, bob) = (
            RequestContext::for_user(UserId::new()),
            RequestContext::for_user(UserId::new()),
        );
        let mine = upload(&fx, &alice, b"mine".to_vec(), "image/png").await;
        let theirs = upload(&fx, &bob, b"theirs".to_vec(), "image/png").await;

        let err = fx.pipeline.batch(&alice, &[&mine, &theirs]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotOwned);
    }

    #[tokio::test]
    async fn test_cached_thumbnail_is_reused() {
        let renderer = Arc::new(FakeRenderer::default());
        let fx = fixture(renderer.clone()).await;
        let ctx = RequestContext::for_user(UserId::new());
        let id = upload(&fx, &ctx, b"photo".to_vec(), "image/png").await;

        let first = fx.pipeline.thumbnail(&ctx, &id).await.expect("render");
        let second = fx.pipeline.thumbnail(&ctx, &id).await.expect("cached");

        assert_eq!(first.data, second.data);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.file.mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_single_thumbnail_errors() {
        let fx = fixture(Arc::new(FakeRenderer::default())).await;
        let ctx = RequestContext::for_user(UserId::new());
        let pdf = upload(&fx, &ctx, b"paper".to_vec(), "application/pdf").await;
        let bad = upload(&fx, &ctx, b"corrupt".to_vec(), "image/png").await;

        let err = fx.pipeline.thumbnail(&ctx, &pdf).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoDerivableAssets);
        let err = fx.pipeline.thumbnail(&ctx, &bad).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TranscodeFailure);
    }

    #[tokio::test]
    async fn test_dropping_archive_cancels_in_flight_renders() {
        let renderer = Arc::new(FakeRenderer::default());
        let dropped = renderer.hung_dropped.clone();
        let fx = fixture(renderer).await;
        let ctx = RequestContext::for_user(UserId::new());
        let quick = upload(&fx, &ctx, b"quick".to_vec(), "image/png").await;
        let stuck = upload(&fx, &ctx, b"hang forever".to_vec(), "video/mp4").await;

        let archive = fx.pipeline.batch(&ctx, &[&quick, &stuck]).await.expect("batch");
        let mut state = archive.state();
        drop(archive);

        let final_state = *state
            .wait_for(ArchiveState::is_terminal)
            .await
            .expect("state");
        assert_eq!(final_state, ArchiveState::Aborted);

        tokio::time::timeout(Duration::from_secs(5), async {
            while !dropped.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("hung render released");
    }

    #[tokio::test]
    async fn test_real_image_thumbnail_is_square_jpeg() {
        let spec = ThumbnailSpec::from(&ThumbnailConfig::default());
        let fx = fixture(Arc::new(MediaTranscoder::new(spec))).await;
        let ctx = RequestContext::for_user(UserId::new());

        let mut png = Vec::new();
        image::RgbImage::from_pixel(640, 480, image::Rgb([200, 40, 40]))
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .expect("encode fixture");
        let id = upload(&fx, &ctx, png, "image/png").await;

        let mut zip = collect(fx.pipeline.batch(&ctx, &[&id]).await.expect("batch")).await;
        let mut jpeg = Vec::new();
        zip.by_index(0)
            .expect("entry")
            .read_to_end(&mut jpeg)
            .expect("read entry");

        let thumb = image::load_from_memory(&jpeg).expect("decode thumbnail");
        assert_eq!((thumb.width(), thumb.height()), (300, 300));
    }
}
