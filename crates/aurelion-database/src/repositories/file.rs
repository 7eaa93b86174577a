//! File repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use aurelion_core::error::{AppError, ErrorKind};
use aurelion_core::result::AppResult;
use aurelion_core::traits::PendingWrite;
use aurelion_core::types::{ContentHash, UserId};
use aurelion_entity::change::ChangeOp;
use aurelion_entity::file::{File, FileSnapshot, NewFile};

use super::FileRepository;

const FILE_COLUMNS: &str =
    "id, user_id, filename, creation_date, size, mime_type, version, created_at";

/// PostgreSQL-backed file repository.
#[derive(Debug, Clone)]
pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    /// Create a new file repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e))
    }
}

/// Serialize writers for one user's ledger and return the next version.
async fn next_version(tx: &mut Transaction<'static, Postgres>, owner: UserId) -> AppResult<i64> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
        .bind(owner)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock ledger", e))?;

    sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(MAX(version), 0) + 1 FROM file_changes WHERE user_id = $1",
    )
    .bind(owner)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to allocate version", e))
}

async fn append_change(
    tx: &mut Transaction<'static, Postgres>,
    owner: UserId,
    version: i64,
    file_id: &ContentHash,
    op: ChangeOp,
    snapshot: Option<FileSnapshot>,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO file_changes (user_id, version, file_id, op, snapshot) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(owner)
    .bind(version)
    .bind(file_id)
    .bind(op)
    .bind(snapshot.map(Json))
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to append change", e))?;
    Ok(())
}

/// An open transaction holding a staged insert.
struct PgPendingWrite {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl PendingWrite for PgPendingWrite {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit file", e))
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to roll back file", e))
    }
}

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn stage_insert(&self, new_file: NewFile) -> AppResult<(File, Box<dyn PendingWrite>)> {
        let mut tx = self.begin().await?;
        let owner = new_file.user_id;
        let version = next_version(&mut tx, owner).await?;

        let inserted = sqlx::query_as::<_, File>(&format!(
            "INSERT INTO files (id, user_id, filename, creation_date, size, mime_type, version, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (user_id, id) DO NOTHING \
             RETURNING {FILE_COLUMNS}"
        ))
        .bind(&new_file.id)
        .bind(owner)
        .bind(&new_file.filename)
        .bind(new_file.creation_date)
        .bind(new_file.size)
        .bind(&new_file.mime_type)
        .bind(version)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert file", e))?;

        let Some(file) = inserted else {
            return Err(AppError::duplicate_content(format!(
                "File {} already exists",
                new_file.id
            )));
        };

        append_change(
            &mut tx,
            owner,
            version,
            &file.id,
            ChangeOp::Insert,
            Some(file.snapshot()),
        )
        .await?;

        debug!(user_id = %owner, file_id = %file.id, version, "Staged file insert");
        let pending: Box<dyn PendingWrite> = Box::new(PgPendingWrite { tx });
        Ok((file, pending))
    }

    async fn delete(&self, owner: UserId, id: &ContentHash) -> AppResult<Option<i64>> {
        let mut tx = self.begin().await?;
        let version = next_version(&mut tx, owner).await?;

        let removed = sqlx::query("DELETE FROM files WHERE user_id = $1 AND id = $2")
            .bind(owner)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete file", e))?
            .rows_affected();

        if removed == 0 {
            return Ok(None);
        }

        append_change(&mut tx, owner, version, id, ChangeOp::Delete, None).await?;
        tx.commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit delete", e))?;
        Ok(Some(version))
    }

    async fn find_owned(&self, owner: UserId, id: &ContentHash) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE user_id = $1 AND id = $2"
        ))
        .bind(owner)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file", e))
    }

    async fn list_owned(&self, owner: UserId) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE user_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list files", e))
    }

    async fn owned_ids(&self, owner: UserId) -> AppResult<Vec<ContentHash>> {
        sqlx::query_scalar::<_, ContentHash>("SELECT id FROM files WHERE user_id = $1")
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read file ids", e))
    }

    async fn count_owned_among(&self, owner: UserId, ids: &[ContentHash]) -> AppResult<u64> {
        let raw: Vec<&str> = ids.iter().map(ContentHash::as_str).collect();
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE user_id = $1 AND id = ANY($2)")
                .bind(owner)
                .bind(&raw)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count owned files", e)
                })?;
        Ok(count.max(0) as u64)
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))
    }
}
