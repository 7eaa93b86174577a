//! In-memory implementation of the repository traits.
//!
//! Mirrors the PostgreSQL semantics closely enough for service and HTTP
//! tests: per-user monotonic versions, staged inserts that only become
//! visible on commit, and atomic delete-plus-append. A staged insert holds
//! the write lock until it is committed or dropped, which plays the role of
//! the per-user advisory lock.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::debug;

use aurelion_core::error::AppError;
use aurelion_core::result::AppResult;
use aurelion_core::traits::PendingWrite;
use aurelion_core::types::{ContentHash, UserId};
use aurelion_entity::change::{ChangeOp, ChangeRecord};
use aurelion_entity::file::{File, NewFile};

use crate::repositories::{ChangeLedger, FileRepository};

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<(UserId, ContentHash), File>,
    changes: BTreeMap<UserId, Vec<ChangeRecord>>,
}

impl State {
    fn next_version(&self, owner: UserId) -> i64 {
        self.changes
            .get(&owner)
            .and_then(|records| records.last())
            .map_or(1, |last| last.version + 1)
    }

    fn append(&mut self, record: ChangeRecord) {
        self.changes.entry(record.user_id).or_default().push(record);
    }
}

/// Process-local database used by tests and single-node experiments.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<RwLock<State>>,
    fail_reads: Arc<AtomicBool>,
}

impl MemoryDatabase {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail with a database error until reset.
    pub fn set_read_failure(&self, failing: bool) {
        self.fail_reads.store(failing, Ordering::SeqCst);
    }

    /// Number of change records stored for `owner`.
    pub async fn change_count(&self, owner: UserId) -> usize {
        self.state
            .read()
            .await
            .changes
            .get(&owner)
            .map_or(0, Vec::len)
    }

    fn check_reads(&self) -> AppResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::database("Simulated read failure"));
        }
        Ok(())
    }
}

/// A staged insert holding the write lock.
struct MemoryPendingWrite {
    guard: OwnedRwLockWriteGuard<State>,
    file: File,
}

#[async_trait]
impl PendingWrite for MemoryPendingWrite {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        let Self { mut guard, file } = *self;
        let record = ChangeRecord {
            user_id: file.user_id,
            version: file.version,
            file_id: file.id.clone(),
            op: ChangeOp::Insert,
            snapshot: Some(Json(file.snapshot())),
            created_at: file.created_at,
        };
        guard.append(record);
        guard.files.insert((file.user_id, file.id.clone()), file);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl FileRepository for MemoryDatabase {
    async fn stage_insert(&self, new_file: NewFile) -> AppResult<(File, Box<dyn PendingWrite>)> {
        let guard = self.state.clone().write_owned().await;
        let key = (new_file.user_id, new_file.id.clone());
        if guard.files.contains_key(&key) {
            return Err(AppError::duplicate_content(format!(
                "File {} already exists",
                new_file.id
            )));
        }

        let version = guard.next_version(new_file.user_id);
        let file = new_file.into_file(version, Utc::now());
        debug!(user_id = %file.user_id, file_id = %file.id, version, "Staged file insert");

        let pending: Box<dyn PendingWrite> = Box::new(MemoryPendingWrite {
            guard,
            file: file.clone(),
        });
        Ok((file, pending))
    }

    async fn delete(&self, owner: UserId, id: &ContentHash) -> AppResult<Option<i64>> {
        let mut state = self.state.write().await;
        if state.files.remove(&(owner, id.clone())).is_none() {
            return Ok(None);
        }

        let version = state.next_version(owner);
        state.append(ChangeRecord {
            user_id: owner,
            version,
            file_id: id.clone(),
            op: ChangeOp::Delete,
            snapshot: None,
            created_at: Utc::now(),
        });
        Ok(Some(version))
    }

    async fn find_owned(&self, owner: UserId, id: &ContentHash) -> AppResult<Option<File>> {
        self.check_reads()?;
        Ok(self.state.read().await.files.get(&(owner, id.clone())).cloned())
    }

    async fn list_owned(&self, owner: UserId) -> AppResult<Vec<File>> {
        self.check_reads()?;
        let state = self.state.read().await;
        let mut files: Vec<File> = state
            .files
            .values()
            .filter(|f| f.user_id == owner)
            .cloned()
            .collect();
        files.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(files)
    }

    async fn owned_ids(&self, owner: UserId) -> AppResult<Vec<ContentHash>> {
        self.check_reads()?;
        let state = self.state.read().await;
        Ok(state
            .files
            .keys()
            .filter(|(user, _)| *user == owner)
            .map(|(_, id)| id.clone())
            .collect())
    }

    async fn count_owned_among(&self, owner: UserId, ids: &[ContentHash]) -> AppResult<u64> {
        self.check_reads()?;
        let state = self.state.read().await;
        let distinct: HashSet<&ContentHash> = ids.iter().collect();
        Ok(distinct
            .into_iter()
            .filter(|id| state.files.contains_key(&(owner, (*id).clone())))
            .count() as u64)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(!self.fail_reads.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl ChangeLedger for MemoryDatabase {
    async fn changes_since(
        &self,
        owner: UserId,
        cursor: i64,
        limit: u32,
    ) -> AppResult<Vec<ChangeRecord>> {
        self.check_reads()?;
        let state = self.state.read().await;
        Ok(state
            .changes
            .get(&owner)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.version > cursor)
                    .take(limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurelion_core::error::ErrorKind;

    fn new_file(owner: UserId, seed: u8) -> NewFile {
        NewFile {
            id: ContentHash::parse(&format!("{seed:02x}").repeat(32)).expect("valid hash"),
            user_id: owner,
            filename: format!("file-{seed}.bin"),
            creation_date: Utc::now(),
            size: 10,
            mime_type: "application/octet-stream".to_string(),
        }
    }

    async fn insert(db: &MemoryDatabase, owner: UserId, seed: u8) -> File {
        let (file, pending) = db.stage_insert(new_file(owner, seed)).await.expect("stage");
        pending.commit().await.expect("commit");
        file
    }

    #[tokio::test]
    async fn test_staged_insert_invisible_until_commit() {
        let db = MemoryDatabase::new();
        let owner = UserId::new();
        let (file, pending) = db.stage_insert(new_file(owner, 1)).await.expect("stage");
        drop(pending);

        assert!(db.find_owned(owner, &file.id).await.expect("find").is_none());
        assert_eq!(db.change_count(owner).await, 0);

        insert(&db, owner, 1).await;
        assert!(db.find_owned(owner, &file.id).await.expect("find").is_some());
    }

    #[tokio::test]
    async fn test_duplicate_rejected_per_owner() {
        let db = MemoryDatabase::new();
        let (alice, bob) = (UserId::new(), UserId::new());
        insert(&db, alice, 1).await;
        insert(&db, bob, 1).await;

        let err = db.stage_insert(new_file(alice, 1)).await.err().expect("duplicate");
        assert_eq!(err.kind, ErrorKind::DuplicateContent);
    }

    #[tokio::test]
    async fn test_versions_are_per_user_and_monotonic() {
        let db = MemoryDatabase::new();
        let (alice, bob) = (UserId::new(), UserId::new());
        let a1 = insert(&db, alice, 1).await;
        let a2 = insert(&db, alice, 2).await;
        let b1 = insert(&db, bob, 3).await;
        assert_eq!((a1.version, a2.version, b1.version), (1, 2, 1));

        let deleted = db.delete(alice, &a1.id).await.expect("delete");
        assert_eq!(deleted, Some(3));
        assert_eq!(db.delete(alice, &a1.id).await.expect("delete"), None);

        let records = db.changes_since(alice, 0, 10).await.expect("ledger");
        let ops: Vec<ChangeOp> = records.iter().map(|r| r.op).collect();
        assert_eq!(ops, vec![ChangeOp::Insert, ChangeOp::Insert, ChangeOp::Delete]);
        assert!(records[2].snapshot().is_none());
    }

    #[tokio::test]
    async fn test_count_owned_among_ignores_other_owners() {
        let db = MemoryDatabase::new();
        let (alice, bob) = (UserId::new(), UserId::new());
        let a = insert(&db, alice, 1).await;
        let b = insert(&db, bob, 2).await;

        let count = db
            .count_owned_among(alice, &[a.id.clone(), b.id.clone(), a.id.clone()])
            .await
            .expect("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_read_failure_toggle() {
        let db = MemoryDatabase::new();
        db.set_read_failure(true);
        let err = db.changes_since(UserId::new(), 0, 10).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Database);
        db.set_read_failure(false);
        assert!(db.changes_since(UserId::new(), 0, 10).await.is_ok());
    }
}
