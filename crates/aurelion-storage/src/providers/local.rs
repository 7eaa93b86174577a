//! Local filesystem storage provider.

use std::io::SeekFrom;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use aurelion_core::error::{AppError, ErrorKind};
use aurelion_core::result::AppResult;
use aurelion_core::traits::storage::{ByteStream, StorageProvider};
use aurelion_core::types::ByteRange;

/// Read buffer used when streaming content out.
const STREAM_CHUNK: usize = 64 * 1024;

/// Local filesystem storage provider.
#[derive(Debug, Clone)]
pub struct LocalStorageProvider {
    /// Root directory for all stored objects.
    root: PathBuf,
}

impl LocalStorageProvider {
    /// Create a new local storage provider rooted at the given path.
    pub async fn new(root_path: impl AsRef<Path>) -> AppResult<Self> {
        let root = root_path.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// The provider's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    async fn open(&self, path: &str) -> AppResult<fs::File> {
        let full_path = self.resolve(path)?;
        fs::File::open(&full_path).await.map_err(|e| not_found_or_storage(e, path, "open"))
    }
}

fn not_found_or_storage(e: std::io::Error, path: &str, action: &str) -> AppError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AppError::not_found(format!("Content missing at {path}"))
    } else {
        AppError::with_source(ErrorKind::Storage, format!("Failed to {action} {path}"), e)
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir() && !m.permissions().readonly())
            .unwrap_or(false))
    }

    async fn write_new(&self, path: &str, data: Bytes) -> AppResult<u64> {
        let full_path = self.resolve(path)?;
        self.ensure_parent(&full_path).await?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full_path)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    AppError::duplicate_content(format!("Content already stored at {path}"))
                } else {
                    AppError::with_source(ErrorKind::Storage, format!("Failed to create {path}"), e)
                }
            })?;

        let written = async {
            file.write_all(&data).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            if let Err(cleanup) = fs::remove_file(&full_path).await {
                warn!(path, error = %cleanup, "Failed to remove partial write");
            }
            return Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write {path}"),
                e,
            ));
        }

        debug!(path, bytes = data.len(), "Wrote new object");
        Ok(data.len() as u64)
    }

    async fn size(&self, path: &str) -> AppResult<u64> {
        let full_path = self.resolve(path)?;
        fs::metadata(&full_path)
            .await
            .map(|m| m.len())
            .map_err(|e| not_found_or_storage(e, path, "stat"))
    }

    async fn read_range(&self, path: &str, range: Option<ByteRange>) -> AppResult<ByteStream> {
        let mut file = self.open(path).await?;

        let Some(range) = range else {
            return Ok(Box::pin(ReaderStream::with_capacity(file, STREAM_CHUNK)));
        };

        file.seek(SeekFrom::Start(range.start))
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to seek", e))?;
        debug!(path, start = range.start, end = range.end, "Streaming byte range");
        Ok(Box::pin(ReaderStream::with_capacity(
            file.take(range.len()),
            STREAM_CHUNK,
        )))
    }

    async fn read_bytes(&self, path: &str) -> AppResult<Bytes> {
        let full_path = self.resolve(path)?;
        fs::read(&full_path)
            .await
            .map(Bytes::from)
            .map_err(|e| not_found_or_storage(e, path, "read"))
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete {path}"),
                e,
            )),
        }
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        let full_path = self.resolve(path)?;
        fs::try_exists(&full_path).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to probe {path}"), e)
        })
    }

    fn resolve(&self, path: &str) -> AppResult<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(AppError::validation(format!("Invalid storage path: {path}")));
        }
        Ok(self.root.join(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn collect(mut stream: ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.expect("chunk"));
        }
        out
    }

    #[tokio::test]
    async fn test_write_new_is_exclusive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = LocalStorageProvider::new(dir.path()).await.expect("provider");

        provider
            .write_new("u/abc", Bytes::from_static(b"first"))
            .await
            .expect("first write");
        let err = provider
            .write_new("u/abc", Bytes::from_static(b"second"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::DuplicateContent);
        let kept = provider.read_bytes("u/abc").await.expect("read");
        assert_eq!(&kept[..], b"first");
    }

    #[tokio::test]
    async fn test_read_range_returns_exact_span() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = LocalStorageProvider::new(dir.path()).await.expect("provider");
        let data: Vec<u8> = (0..500u32).map(|i| (i % 251) as u8).collect();
        provider
            .write_new("u/blob", Bytes::from(data.clone()))
            .await
            .expect("write");

        let stream = provider
            .read_range("u/blob", Some(ByteRange { start: 0, end: 99 }))
            .await
            .expect("range");
        assert_eq!(collect(stream).await, data[..100]);

        let stream = provider
            .read_range("u/blob", Some(ByteRange { start: 450, end: 499 }))
            .await
            .expect("range");
        assert_eq!(collect(stream).await, data[450..]);

        let full = provider.read_range("u/blob", None).await.expect("full");
        assert_eq!(collect(full).await, data);
    }

    #[tokio::test]
    async fn test_missing_content_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = LocalStorageProvider::new(dir.path()).await.expect("provider");
        let err = provider.read_range("u/none", None).await.err().expect("missing");
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(provider.delete("u/none").await.is_ok());
    }

    #[tokio::test]
    async fn test_resolve_rejects_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = LocalStorageProvider::new(dir.path()).await.expect("provider");
        assert!(provider.resolve("../etc/passwd").is_err());
        assert!(provider.resolve("u/../x").is_err());
        assert!(provider.resolve("/u/x").is_ok());
    }
}
