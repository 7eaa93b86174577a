//! Sync protocol value objects.

use serde::{Deserialize, Serialize};

use aurelion_core::types::ContentHash;

use crate::file::FileSnapshot;

/// One page of a ledger pull.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPage {
    /// Files inserted or updated, as of their record's version.
    pub items: Vec<FileSnapshot>,
    /// Ids of files deleted within the page.
    pub deleted_ids: Vec<ContentHash>,
    /// Cursor to pass on the next pull.
    pub next_version: i64,
    /// Number of ledger rows the page was built from.
    #[serde(skip)]
    pub row_count: usize,
}

impl SyncPage {
    /// Whether the caller has caught up, given the limit it asked for.
    pub fn is_caught_up(&self, limit: u32) -> bool {
        self.row_count < limit as usize
    }
}

/// Aggregate fingerprint of a user's file set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDigest {
    /// SHA-256 over the sorted, concatenated file ids.
    pub state_hash: String,
    /// Number of files owned.
    pub file_count: u64,
}
