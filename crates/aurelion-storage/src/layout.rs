//! Deterministic on-disk locations.
//!
//! Content lives under `<user id>/<content hash>` inside the content root and
//! thumbnails under `<user id>/<file id>.jpg` inside the thumbnail root. Both
//! are partitioned by owner so users never contend for the same directory.

use aurelion_core::types::{ContentHash, UserId};

/// Extension of generated thumbnails.
pub const THUMBNAIL_EXTENSION: &str = "jpg";

/// MIME type of generated thumbnails.
pub const THUMBNAIL_MIME: &str = "image/jpeg";

/// Relative path of a file's bytes.
pub fn content_path(owner: UserId, hash: &ContentHash) -> String {
    format!("{owner}/{hash}")
}

/// Relative path of a file's cached thumbnail.
pub fn thumbnail_path(owner: UserId, file_id: &ContentHash) -> String {
    format!("{owner}/{file_id}.{THUMBNAIL_EXTENSION}")
}

/// Name of a thumbnail inside a batch archive.
pub fn archive_entry_name(file_id: &ContentHash) -> String {
    format!("{file_id}.{THUMBNAIL_EXTENSION}")
}
