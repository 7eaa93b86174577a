//! Change ledger repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use aurelion_core::error::{AppError, ErrorKind};
use aurelion_core::result::AppResult;
use aurelion_core::types::UserId;
use aurelion_entity::change::ChangeRecord;

use super::ChangeLedger;

/// PostgreSQL-backed reader for `file_changes`.
#[derive(Debug, Clone)]
pub struct PgChangeLedger {
    pool: PgPool,
}

impl PgChangeLedger {
    /// Create a new ledger reader.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChangeLedger for PgChangeLedger {
    async fn changes_since(
        &self,
        owner: UserId,
        cursor: i64,
        limit: u32,
    ) -> AppResult<Vec<ChangeRecord>> {
        sqlx::query_as::<_, ChangeRecord>(
            "SELECT user_id, version, file_id, op, snapshot, created_at \
             FROM file_changes \
             WHERE user_id = $1 AND version > $2 \
             ORDER BY version ASC \
             LIMIT $3",
        )
        .bind(owner)
        .bind(cursor)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read change ledger", e))
    }
}
