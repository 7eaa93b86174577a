//! Sync ledger paging configuration.

use serde::{Deserialize, Serialize};

/// Page limits applied to ledger pulls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Limit used when the caller does not supply one.
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    /// Upper bound on caller-supplied limits.
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_limit() -> u32 {
    100
}

fn default_max_limit() -> u32 {
    1000
}
