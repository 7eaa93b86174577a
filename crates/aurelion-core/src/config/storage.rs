//! Content storage configuration.

use serde::{Deserialize, Serialize};

/// Where uploaded bytes live and how large they may be.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for content; bytes land at `<root>/<user id>/<hash>`.
    #[serde(default = "default_root")]
    pub root: String,
    /// Maximum upload size in bytes (default 2 GB).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            max_upload_size_bytes: default_max_upload(),
        }
    }
}

fn default_root() -> String {
    "./data/storage".to_string()
}

fn default_max_upload() -> u64 {
    2_147_483_648 // 2 GB
}
