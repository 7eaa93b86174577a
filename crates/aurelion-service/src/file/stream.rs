//! Full and partial reads of stored content.

use std::sync::Arc;

use tracing::debug;

use aurelion_core::error::AppError;
use aurelion_core::result::AppResult;
use aurelion_core::traits::{ByteStream, StorageProvider};
use aurelion_core::types::{ByteRange, RangeRequest};
use aurelion_database::FileRepository;
use aurelion_entity::file::File;
use aurelion_storage::layout::content_path;

use crate::context::RequestContext;
use crate::ownership::OwnershipGuard;

/// An opened read, ready to be streamed.
pub struct RangeRead {
    /// The file being read.
    pub file: File,
    /// Size of the stored content.
    pub total_size: u64,
    /// The span being served, or `None` for the whole body.
    pub range: Option<ByteRange>,
    /// The bytes.
    pub body: ByteStream,
}

impl std::fmt::Debug for RangeRead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeRead")
            .field("file_id", &self.file.id)
            .field("total_size", &self.total_size)
            .field("range", &self.range)
            .finish()
    }
}

impl RangeRead {
    /// Number of bytes the body will yield.
    pub fn content_length(&self) -> u64 {
        self.range.map_or(self.total_size, |r| r.len())
    }
}

/// Opens stored content for streaming, optionally restricted to a range.
pub struct RangeReader {
    files: Arc<dyn FileRepository>,
    content: Arc<dyn StorageProvider>,
    guard: Arc<OwnershipGuard>,
}

impl std::fmt::Debug for RangeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeReader").finish()
    }
}

impl RangeReader {
    /// Creates a new range reader.
    pub fn new(
        files: Arc<dyn FileRepository>,
        content: Arc<dyn StorageProvider>,
        guard: Arc<OwnershipGuard>,
    ) -> Self {
        Self {
            files,
            content,
            guard,
        }
    }

    /// Check ownership and report the stored size of the file's bytes.
    ///
    /// Fails with `NotOwned` before touching storage and with `NotFound` if
    /// the row exists but its bytes do not.
    pub async fn stat(&self, ctx: &RequestContext, raw_id: &str) -> AppResult<(File, u64)> {
        let id = self.guard.require_one(ctx.user_id, raw_id).await?;
        let file = self
            .files
            .find_owned(ctx.user_id, &id)
            .await?
            .ok_or_else(|| AppError::not_owned(format!("File {id} vanished")))?;
        let total_size = self.content.size(&content_path(ctx.user_id, &id)).await?;
        Ok((file, total_size))
    }

    /// Open the bytes of a file already checked with [`stat`](Self::stat).
    pub async fn read(
        &self,
        file: File,
        total_size: u64,
        range: Option<ByteRange>,
    ) -> AppResult<RangeRead> {
        let body = self
            .content
            .read_range(&content_path(file.user_id, &file.id), range)
            .await?;
        debug!(user_id = %file.user_id, file_id = %file.id, ?range, total_size, "Opened content stream");
        Ok(RangeRead {
            file,
            total_size,
            range,
            body,
        })
    }

    /// [`stat`](Self::stat), resolve `range`, then [`read`](Self::read).
    ///
    /// A range starting past the end of the content fails with
    /// `RangeNotSatisfiable`.
    pub async fn open(
        &self,
        ctx: &RequestContext,
        raw_id: &str,
        range: Option<RangeRequest>,
    ) -> AppResult<RangeRead> {
        let (file, total_size) = self.stat(ctx, raw_id).await?;
        let range = range.map(|r| r.resolve(total_size)).transpose()?;
        self.read(file, total_size, range).await
    }
}
