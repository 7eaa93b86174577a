//! Storage provider trait for the content and thumbnail byte stores.

use std::path::PathBuf;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::result::AppResult;
use crate::types::ByteRange;

/// A byte stream type used for reading file contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Trait for byte storage backends.
///
/// Paths are relative to the provider's root. The local filesystem provider
/// in `aurelion-storage` is the only implementation.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Check whether the provider root is present and writable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Write bytes at `path`, failing with `DuplicateContent` if anything
    /// already exists there. Never overwrites.
    async fn write_new(&self, path: &str, data: Bytes) -> AppResult<u64>;

    /// Size of the object at `path`; `NotFound` if missing.
    async fn size(&self, path: &str) -> AppResult<u64>;

    /// Stream the object, or only `range` of it.
    async fn read_range(&self, path: &str, range: Option<ByteRange>) -> AppResult<ByteStream>;

    /// Read the whole object into memory.
    async fn read_bytes(&self, path: &str) -> AppResult<Bytes>;

    /// Delete the object at `path`. Missing objects are not an error.
    async fn delete(&self, path: &str) -> AppResult<()>;

    /// Check whether an object exists at `path`.
    async fn exists(&self, path: &str) -> AppResult<bool>;

    /// Absolute filesystem location of `path`, for handing to subprocesses.
    fn resolve(&self, path: &str) -> AppResult<PathBuf>;
}
