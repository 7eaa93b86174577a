//! File entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use aurelion_core::types::{ContentHash, UserId};

use super::snapshot::FileSnapshot;

/// A file owned by exactly one user, identified by the hash of its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct File {
    /// Content hash; doubles as the checksum.
    pub id: ContentHash,
    /// The owning user.
    pub user_id: UserId,
    /// Original filename supplied at upload.
    pub filename: String,
    /// Creation timestamp declared by the client.
    pub creation_date: DateTime<Utc>,
    /// Size in bytes.
    pub size: i64,
    /// MIME type declared at upload.
    pub mime_type: String,
    /// Ledger version of the change that last touched this row.
    pub version: i64,
    /// When the row was inserted.
    pub created_at: DateTime<Utc>,
}

impl File {
    /// Project into the wire snapshot recorded in the ledger.
    pub fn snapshot(&self) -> FileSnapshot {
        FileSnapshot {
            id: self.id.clone(),
            version: self.version,
            name: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            size: self.size,
            creation_date: self.creation_date,
            checksum: self.id.clone(),
        }
    }
}

/// Data required to create a new file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFile {
    /// Server-computed content hash.
    pub id: ContentHash,
    /// The owning user.
    pub user_id: UserId,
    /// Original filename.
    pub filename: String,
    /// Declared creation timestamp.
    pub creation_date: DateTime<Utc>,
    /// Size in bytes.
    pub size: i64,
    /// Declared MIME type.
    pub mime_type: String,
}

impl NewFile {
    /// Materialize the row as it will be stored at `version`.
    pub fn into_file(self, version: i64, created_at: DateTime<Utc>) -> File {
        File {
            id: self.id,
            user_id: self.user_id,
            filename: self.filename,
            creation_date: self.creation_date,
            size: self.size,
            mime_type: self.mime_type,
            version,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(mime: &str) -> File {
        NewFile {
            id: ContentHash::parse(&"ab".repeat(32)).expect("valid hash"),
            user_id: UserId::new(),
            filename: "beach.jpg".to_string(),
            creation_date: Utc::now(),
            size: 1024,
            mime_type: mime.to_string(),
        }
        .into_file(7, Utc::now())
    }

    #[test]
    fn test_snapshot_carries_checksum_and_version() {
        let file = sample("image/jpeg");
        let snap = file.snapshot();
        assert_eq!(snap.version, 7);
        assert_eq!(snap.checksum, file.id);
        assert_eq!(snap.name, "beach.jpg");
    }
}
