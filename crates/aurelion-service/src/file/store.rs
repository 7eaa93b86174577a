//! Content store: checksummed upload, listing, and deletion.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use aurelion_core::error::AppError;
use aurelion_core::result::AppResult;
use aurelion_core::traits::StorageProvider;
use aurelion_core::types::ContentHash;
use aurelion_database::FileRepository;
use aurelion_entity::file::{File, FileSnapshot, NewFile};
use aurelion_storage::checksum::verify_checksum;
use aurelion_storage::layout::{content_path, thumbnail_path};

use crate::context::RequestContext;
use crate::ownership::OwnershipGuard;

/// Everything the client sends with an upload.
#[derive(Debug, Clone)]
pub struct UploadParams {
    /// Raw file bytes.
    pub data: Bytes,
    /// Original filename.
    pub filename: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// Client-side creation timestamp.
    pub creation_date: DateTime<Utc>,
    /// Checksum the client computed before sending.
    pub declared_checksum: ContentHash,
}

/// Stores and removes file content together with its ledger entries.
pub struct ContentStore {
    files: Arc<dyn FileRepository>,
    content: Arc<dyn StorageProvider>,
    thumbnails: Arc<dyn StorageProvider>,
    guard: Arc<OwnershipGuard>,
    max_upload_size: u64,
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore")
            .field("max_upload_size", &self.max_upload_size)
            .finish()
    }
}

impl ContentStore {
    /// Creates a new content store.
    pub fn new(
        files: Arc<dyn FileRepository>,
        content: Arc<dyn StorageProvider>,
        thumbnails: Arc<dyn StorageProvider>,
        guard: Arc<OwnershipGuard>,
        max_upload_size: u64,
    ) -> Self {
        Self {
            files,
            content,
            thumbnails,
            guard,
            max_upload_size,
        }
    }

    /// Verify and persist an upload.
    ///
    /// The row and its insert record are staged first, the bytes are written
    /// with exclusive create, and only then is the transaction committed. Any
    /// failure leaves neither a row nor a change record behind.
    pub async fn store(&self, ctx: &RequestContext, params: UploadParams) -> AppResult<File> {
        if params.data.len() as u64 > self.max_upload_size {
            return Err(AppError::validation(format!(
                "Upload size {} exceeds maximum {}",
                params.data.len(),
                self.max_upload_size
            )));
        }

        let id = verify_checksum(&params.data, &params.declared_checksum)?;
        let new_file = NewFile {
            id: id.clone(),
            user_id: ctx.user_id,
            filename: params.filename,
            creation_date: params.creation_date,
            size: params.data.len() as i64,
            mime_type: params.mime_type,
        };

        let (file, pending) = self.files.stage_insert(new_file).await?;
        let path = content_path(ctx.user_id, &id);

        if let Err(e) = self.content.write_new(&path, params.data).await {
            if let Err(rollback) = pending.rollback().await {
                warn!(file_id = %id, error = %rollback, "Rollback after failed write failed");
            }
            return Err(e);
        }

        if let Err(e) = pending.commit().await {
            if let Err(cleanup) = self.content.delete(&path).await {
                warn!(path = %path, error = %cleanup, "Failed to remove bytes of uncommitted upload");
            }
            return Err(e);
        }

        info!(
            user_id = %ctx.user_id,
            file_id = %file.id,
            version = file.version,
            size = file.size,
            "File stored"
        );
        Ok(file)
    }

    /// All of the caller's files.
    pub async fn list(&self, ctx: &RequestContext) -> AppResult<Vec<FileSnapshot>> {
        let files = self.files.list_owned(ctx.user_id).await?;
        Ok(files.iter().map(File::snapshot).collect())
    }

    /// Delete one of the caller's files.
    ///
    /// The row removal and its delete record commit together; the bytes and
    /// any cached thumbnail are removed afterwards on a best-effort basis.
    pub async fn delete(&self, ctx: &RequestContext, raw_id: &str) -> AppResult<ContentHash> {
        let id = self.guard.require_one(ctx.user_id, raw_id).await?;

        let Some(version) = self.files.delete(ctx.user_id, &id).await? else {
            return Err(AppError::not_owned(format!("File {id} vanished before delete")));
        };

        let path = content_path(ctx.user_id, &id);
        if let Err(e) = self.content.delete(&path).await {
            warn!(path = %path, error = %e, "Failed to remove deleted file's bytes");
        }
        let thumb = thumbnail_path(ctx.user_id, &id);
        if let Err(e) = self.thumbnails.delete(&thumb).await {
            warn!(path = %thumb, error = %e, "Failed to remove deleted file's thumbnail");
        }

        info!(user_id = %ctx.user_id, file_id = %id, version, "File deleted");
        Ok(id)
    }
}
