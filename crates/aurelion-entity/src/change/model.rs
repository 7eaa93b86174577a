//! Change record entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

use aurelion_core::types::{ContentHash, UserId};

use super::op::ChangeOp;
use crate::file::FileSnapshot;

/// One immutable entry in a user's append-only change ledger.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChangeRecord {
    /// The user whose ledger this belongs to.
    pub user_id: UserId,
    /// Per-user version, strictly increasing.
    pub version: i64,
    /// The file the change concerns.
    pub file_id: ContentHash,
    /// What happened.
    pub op: ChangeOp,
    /// Full file state for insert/update; absent for delete.
    pub snapshot: Option<Json<FileSnapshot>>,
    /// When the record was appended.
    pub created_at: DateTime<Utc>,
}

impl ChangeRecord {
    /// Borrow the snapshot, if this record carries one.
    pub fn snapshot(&self) -> Option<&FileSnapshot> {
        self.snapshot.as_ref().map(|json| &json.0)
    }
}
