//! Repository traits and their PostgreSQL implementations.
//!
//! Services depend on the traits so that the in-memory database can stand
//! in for PostgreSQL in tests.

pub mod change;
pub mod file;

use async_trait::async_trait;

use aurelion_core::result::AppResult;
use aurelion_core::traits::PendingWrite;
use aurelion_core::types::{ContentHash, UserId};
use aurelion_entity::change::ChangeRecord;
use aurelion_entity::file::{File, NewFile};

pub use change::PgChangeLedger;
pub use file::PgFileRepository;

/// Persistence for file rows.
///
/// Every mutation appends exactly one change record in the same commit.
#[async_trait]
pub trait FileRepository: Send + Sync + std::fmt::Debug + 'static {
    /// Stage a new file row and its insert record without making them visible.
    ///
    /// Fails with `DuplicateContent` if the owner already has a file with this id.
    async fn stage_insert(&self, new_file: NewFile) -> AppResult<(File, Box<dyn PendingWrite>)>;

    /// Delete the owner's file and append a delete record.
    ///
    /// Returns the version of the delete record, or `None` if no row matched.
    async fn delete(&self, owner: UserId, id: &ContentHash) -> AppResult<Option<i64>>;

    /// Find one of the owner's files.
    async fn find_owned(&self, owner: UserId, id: &ContentHash) -> AppResult<Option<File>>;

    /// All of the owner's files, oldest first.
    async fn list_owned(&self, owner: UserId) -> AppResult<Vec<File>>;

    /// Ids of all of the owner's files, in no particular order.
    async fn owned_ids(&self, owner: UserId) -> AppResult<Vec<ContentHash>>;

    /// How many distinct rows among `ids` belong to the owner.
    async fn count_owned_among(&self, owner: UserId, ids: &[ContentHash]) -> AppResult<u64>;

    /// Check that the backing store answers queries.
    async fn health_check(&self) -> AppResult<bool>;
}

/// Read access to the append-only change ledger.
#[async_trait]
pub trait ChangeLedger: Send + Sync + std::fmt::Debug + 'static {
    /// Records with `version > cursor`, ascending, at most `limit` of them.
    async fn changes_since(
        &self,
        owner: UserId,
        cursor: i64,
        limit: u32,
    ) -> AppResult<Vec<ChangeRecord>>;
}
