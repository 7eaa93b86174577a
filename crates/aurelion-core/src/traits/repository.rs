//! Transactional hooks shared by repository implementations.

use async_trait::async_trait;

use crate::result::AppResult;

/// A persistence mutation that has been applied inside an open transaction
/// but not yet made visible.
///
/// The Content Store stages the file row and its change record, writes the
/// bytes, and only then commits. Dropping a pending write without calling
/// [`PendingWrite::commit`] rolls it back.
#[async_trait]
pub trait PendingWrite: Send {
    /// Make the staged mutation durable and visible to readers.
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// Discard the staged mutation explicitly.
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}
