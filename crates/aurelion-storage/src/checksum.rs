//! SHA-256 content checksums.

use sha2::{Digest, Sha256};

use aurelion_core::error::AppError;
use aurelion_core::result::AppResult;
use aurelion_core::types::ContentHash;

/// Compute the lowercase hex SHA-256 of `data`.
pub fn compute_checksum(data: &[u8]) -> ContentHash {
    ContentHash::from_canonical(hex::encode(Sha256::digest(data)))
}

/// Recompute the digest and compare it to what the client declared.
///
/// Returns the server-side digest on match.
pub fn verify_checksum(data: &[u8], declared: &ContentHash) -> AppResult<ContentHash> {
    let actual = compute_checksum(data);
    if &actual != declared {
        return Err(AppError::checksum_mismatch(format!(
            "Declared checksum {declared} does not match received content {actual}"
        )));
    }
    Ok(actual)
}
