//! Cursor-paginated reads of the change ledger.

use std::sync::Arc;

use tracing::{debug, error};

use aurelion_core::config::SyncConfig;
use aurelion_core::error::{AppError, ErrorKind};
use aurelion_core::result::AppResult;
use aurelion_core::types::UserId;
use aurelion_database::ChangeLedger;
use aurelion_entity::change::ChangeOp;
use aurelion_entity::sync::SyncPage;

/// Serves ordered pages of a user's change records.
///
/// Clients call [`pull`](Self::pull) with the previous `next_version` until a
/// page comes back with fewer rows than the limit.
pub struct SyncService {
    ledger: Arc<dyn ChangeLedger>,
    default_limit: u32,
    max_limit: u32,
}

impl std::fmt::Debug for SyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService")
            .field("default_limit", &self.default_limit)
            .field("max_limit", &self.max_limit)
            .finish()
    }
}

impl SyncService {
    /// Creates a new sync service.
    pub fn new(ledger: Arc<dyn ChangeLedger>, config: &SyncConfig) -> Self {
        let max_limit = config.max_limit.max(1);
        Self {
            ledger,
            default_limit: config.default_limit.clamp(1, max_limit),
            max_limit,
        }
    }

    /// The limit used for a requested one.
    ///
    /// Limits outside `1..=max_limit` are rejected, never clamped.
    pub fn effective_limit(&self, requested: Option<u32>) -> AppResult<u32> {
        match requested {
            None => Ok(self.default_limit),
            Some(limit) if (1..=self.max_limit).contains(&limit) => Ok(limit),
            Some(limit) => Err(AppError::validation(format!(
                "limit must be between 1 and {}, got {limit}",
                self.max_limit
            ))),
        }
    }

    /// Records after `cursor`, split into upserted snapshots and deleted ids.
    ///
    /// `next_version` is the highest version in the page, or `cursor` itself
    /// when nothing is newer.
    pub async fn pull(
        &self,
        owner: UserId,
        cursor: i64,
        limit: Option<u32>,
    ) -> AppResult<SyncPage> {
        if cursor < 0 {
            return Err(AppError::validation("version must not be negative"));
        }
        let limit = self.effective_limit(limit)?;

        let records = self
            .ledger
            .changes_since(owner, cursor, limit)
            .await
            .map_err(|e| {
                error!(user_id = %owner, cursor, error = %e, "Change ledger query failed");
                AppError::with_source(
                    ErrorKind::LedgerQueryFailure,
                    "Failed to read change ledger",
                    e,
                )
            })?;

        let mut page = SyncPage {
            next_version: cursor,
            row_count: records.len(),
            ..SyncPage::default()
        };
        for record in records {
            page.next_version = page.next_version.max(record.version);
            match (record.op, record.snapshot) {
                (ChangeOp::Delete, _) => page.deleted_ids.push(record.file_id),
                (ChangeOp::Insert | ChangeOp::Update, Some(snapshot)) => {
                    page.items.push(snapshot.0)
                }
                (op, None) => {
                    return Err(AppError::ledger_query(format!(
                        "Change record {} ({op}) has no snapshot",
                        record.version
                    )));
                }
            }
        }

        debug!(
            user_id = %owner,
            cursor,
            limit,
            rows = page.row_count,
            next_version = page.next_version,
            "Served sync page"
        );
        Ok(page)
    }
}
