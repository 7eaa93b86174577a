//! Ownership checks run before any read, delete, or derive.
//!
//! A failed check is reported as [`ErrorKind::NotOwned`], which the HTTP
//! layer renders exactly like a missing file so callers cannot probe for
//! ids that belong to someone else.
//!
//! [`ErrorKind::NotOwned`]: aurelion_core::error::ErrorKind::NotOwned

use std::sync::Arc;

use tracing::debug;

use aurelion_core::error::AppError;
use aurelion_core::result::AppResult;
use aurelion_core::types::{ContentHash, UserId};
use aurelion_database::FileRepository;

/// Verifies that a caller owns a set of file ids.
pub struct OwnershipGuard {
    files: Arc<dyn FileRepository>,
}

impl std::fmt::Debug for OwnershipGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnershipGuard").finish()
    }
}

impl OwnershipGuard {
    /// Creates a new ownership guard.
    pub fn new(files: Arc<dyn FileRepository>) -> Self {
        Self { files }
    }

    /// `true` iff every id is well formed and owned by `owner`.
    ///
    /// An empty list, a malformed id, or a repeated id yields `false`.
    /// Repository failures still propagate as errors.
    pub async fn verify<S: AsRef<str>>(&self, owner: UserId, raw_ids: &[S]) -> AppResult<bool> {
        Ok(self.check(owner, raw_ids).await?.is_some())
    }

    /// Parse and verify, returning the ids or `NotOwned`.
    pub async fn require<S: AsRef<str>>(
        &self,
        owner: UserId,
        raw_ids: &[S],
    ) -> AppResult<Vec<ContentHash>> {
        self.check(owner, raw_ids)
            .await?
            .ok_or_else(|| AppError::not_owned(format!("User {owner} does not own all requested files")))
    }

    /// Single-id form of [`require`](Self::require).
    pub async fn require_one(&self, owner: UserId, raw_id: &str) -> AppResult<ContentHash> {
        let mut ids = self.require(owner, &[raw_id]).await?;
        ids.pop()
            .ok_or_else(|| AppError::internal("Ownership check returned no id"))
    }

    async fn check<S: AsRef<str>>(
        &self,
        owner: UserId,
        raw_ids: &[S],
    ) -> AppResult<Option<Vec<ContentHash>>> {
        if raw_ids.is_empty() {
            return Ok(None);
        }
        let Ok(ids) = raw_ids
            .iter()
            .map(|raw| ContentHash::parse(raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()
        else {
            debug!(user_id = %owner, "Ownership check on malformed id");
            return Ok(None);
        };

        let matched = self.files.count_owned_among(owner, &ids).await?;
        if matched != ids.len() as u64 {
            debug!(user_id = %owner, requested = ids.len(), matched, "Ownership check failed");
            return Ok(None);
        }
        Ok(Some(ids))
    }
}
