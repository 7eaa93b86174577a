//! Ledger operation kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The mutation a change record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "change_op", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    /// A file was created.
    Insert,
    /// A file's metadata changed.
    Update,
    /// A file was removed.
    Delete,
}

impl ChangeOp {
    /// Whether records of this kind carry a snapshot.
    pub fn has_snapshot(&self) -> bool {
        !matches!(self, Self::Delete)
    }

    /// Return the operation as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
