//! Response DTOs.

use serde::{Deserialize, Serialize};

use aurelion_entity::file::FileSnapshot;

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// The file's id.
    pub id: String,
    /// Server-computed checksum; equal to `id`.
    pub checksum: String,
    /// Always `"processed"`.
    pub status: String,
}

/// Result of a delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// The deleted file's id.
    pub id: String,
}

/// Full listing of the caller's files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileListResponse {
    /// Every file, oldest first.
    pub items: Vec<FileSnapshot>,
    /// Number of items.
    pub count: usize,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Database status.
    pub database: String,
    /// Content storage status.
    pub storage: String,
}
