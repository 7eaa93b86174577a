//! Unified application error types for Aurelion.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. Only a handful of kinds are
//! domain-classified (checksum, duplicate content, ownership); everything
//! coming out of the persistence collaborator is carried opaquely.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The server-side digest of an upload differs from the declared checksum.
    ChecksumMismatch,
    /// Exclusive-create collision: identical content already stored for the user.
    DuplicateContent,
    /// The caller does not own one or more of the referenced files.
    NotOwned,
    /// A row or its stored bytes are missing.
    NotFound,
    /// Reading the change ledger failed; safe to retry from the same cursor.
    LedgerQueryFailure,
    /// A thumbnail batch produced zero usable outputs.
    NoDerivableAssets,
    /// A single thumbnail could not be produced.
    TranscodeFailure,
    /// The requested byte range lies outside the stored content.
    RangeNotSatisfiable,
    /// Input validation failed.
    Validation,
    /// The bearer token is missing or invalid.
    Authentication,
    /// A database error occurred.
    Database,
    /// A storage I/O error occurred.
    Storage,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal server error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChecksumMismatch => write!(f, "CHECKSUM_MISMATCH"),
            Self::DuplicateContent => write!(f, "DUPLICATE_CONTENT"),
            Self::NotOwned => write!(f, "NOT_OWNED"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::LedgerQueryFailure => write!(f, "LEDGER_QUERY_FAILURE"),
            Self::NoDerivableAssets => write!(f, "NO_DERIVABLE_ASSETS"),
            Self::TranscodeFailure => write!(f, "TRANSCODE_FAILURE"),
            Self::RangeNotSatisfiable => write!(f, "RANGE_NOT_SATISFIABLE"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Authentication => write!(f, "AUTHENTICATION"),
            Self::Database => write!(f, "DATABASE"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

impl ErrorKind {
    /// Whether this kind carries a message that is safe to show to clients.
    ///
    /// Everything else collapses into a generic internal error at the
    /// transport boundary so that paths and query text never leak.
    pub fn is_client_facing(&self) -> bool {
        matches!(
            self,
            Self::ChecksumMismatch
                | Self::DuplicateContent
                | Self::NotOwned
                | Self::NotFound
                | Self::NoDerivableAssets
                | Self::RangeNotSatisfiable
                | Self::Validation
                | Self::Authentication
        )
    }
}

/// The unified application error used throughout Aurelion.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls. This provides a single error type for
/// the entire application boundary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a checksum-mismatch error.
    pub fn checksum_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ChecksumMismatch, message)
    }

    /// Create a duplicate-content error.
    pub fn duplicate_content(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateContent, message)
    }

    /// Create a not-owned error. The message is never shown to clients.
    pub fn not_owned(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotOwned, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a ledger query failure.
    pub fn ledger_query(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LedgerQueryFailure, message)
    }

    /// Create a no-derivable-assets error.
    pub fn no_derivable_assets(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoDerivableAssets, message)
    }

    /// Create a transcode failure.
    pub fn transcode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TranscodeFailure, message)
    }

    /// Create a range-not-satisfiable error.
    pub fn range_not_satisfiable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RangeNotSatisfiable, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Check the error kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::with_source(ErrorKind::Internal, format!("Task failed: {err}"), err)
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::with_source(ErrorKind::Database, format!("Database error: {err}"), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = AppError::checksum_mismatch("digest differs");
        assert_eq!(err.to_string(), "CHECKSUM_MISMATCH: digest differs");
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: AppError = io.into();
        assert!(err.is(ErrorKind::Storage));
        assert!(!err.kind.is_client_facing());
    }

    #[test]
    fn test_clone_drops_source() {
        let io = std::io::Error::other("boom");
        let err = AppError::with_source(ErrorKind::Database, "query failed", io);
        let cloned = err.clone();
        assert!(cloned.source.is_none());
        assert_eq!(cloned.kind, ErrorKind::Database);
    }
}
