//! Aggregate fingerprint of a user's file set.

use std::sync::Arc;

use tracing::debug;

use aurelion_core::result::AppResult;
use aurelion_core::types::UserId;
use aurelion_database::FileRepository;
use aurelion_entity::sync::StateDigest;
use aurelion_storage::compute_checksum;

/// Computes `(stateHash, fileCount)` for drift detection.
///
/// The hash covers only the set of ids. Metadata changes do not move it.
pub struct DigestService {
    files: Arc<dyn FileRepository>,
}

impl std::fmt::Debug for DigestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestService").finish()
    }
}

impl DigestService {
    /// Creates a new digest service.
    pub fn new(files: Arc<dyn FileRepository>) -> Self {
        Self { files }
    }

    /// Digest the owner's current file set. Zero files is a valid state.
    pub async fn digest(&self, owner: UserId) -> AppResult<StateDigest> {
        let mut ids = self.files.owned_ids(owner).await?;
        ids.sort_unstable();

        let concatenated: String = ids.iter().map(|id| id.as_str()).collect();
        let state_hash = compute_checksum(concatenated.as_bytes()).to_string();

        debug!(user_id = %owner, file_count = ids.len(), "Computed state digest");
        Ok(StateDigest {
            state_hash,
            file_count: ids.len() as u64,
        })
    }
}
