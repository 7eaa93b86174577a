//! Wire projection of a file as of a ledger version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aurelion_core::types::ContentHash;

/// The full state of a file at a given version.
///
/// Stored verbatim in the change ledger for insert/update records and
/// returned by sync pulls and listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSnapshot {
    /// File id (content hash).
    pub id: ContentHash,
    /// Ledger version this snapshot was recorded at.
    pub version: i64,
    /// Original filename.
    pub name: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub size: i64,
    /// Declared creation timestamp.
    pub creation_date: DateTime<Utc>,
    /// SHA-256 checksum of the content.
    pub checksum: ContentHash,
}
