//! Maps domain `AppError` to HTTP responses.
//!
//! Only domain-classified kinds carry a specific message to the client.
//! Everything else is logged in full and answered with a generic body, so
//! storage paths and SQL never leave the process.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use aurelion_core::error::{AppError, ErrorKind};

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Optional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// An [`AppError`] on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// Status, code, and client-visible message for this error.
    fn classify(&self) -> (StatusCode, &'static str, String) {
        let err = &self.0;
        match err.kind {
            ErrorKind::ChecksumMismatch => (
                StatusCode::BAD_REQUEST,
                "CHECKSUM_MISMATCH",
                "The file received by the server is corrupted; try again".to_string(),
            ),
            ErrorKind::DuplicateContent => (
                StatusCode::CONFLICT,
                "DUPLICATE_CONTENT",
                "This file has already been uploaded".to_string(),
            ),
            ErrorKind::NotOwned | ErrorKind::NotFound => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", "File not found".to_string())
            }
            ErrorKind::NoDerivableAssets => (
                StatusCode::NOT_FOUND,
                "NO_DERIVABLE_ASSETS",
                "No thumbnails available".to_string(),
            ),
            ErrorKind::RangeNotSatisfiable => (
                StatusCode::RANGE_NOT_SATISFIABLE,
                "RANGE_NOT_SATISFIABLE",
                err.message.clone(),
            ),
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.message.clone()),
            ErrorKind::Authentication => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", err.message.clone())
            }
            ErrorKind::LedgerQueryFailure => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "LEDGER_QUERY_FAILURE",
                "Could not read changes; retry from the same version".to_string(),
            ),
            ErrorKind::TranscodeFailure
            | ErrorKind::Database
            | ErrorKind::Storage
            | ErrorKind::Configuration
            | ErrorKind::Serialization
            | ErrorKind::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = self.classify();

        if status.is_server_error() {
            tracing::error!(
                kind = %self.0.kind,
                error = %self.0.message,
                source = ?self.0.source,
                "Request failed"
            );
        } else {
            tracing::debug!(kind = %self.0.kind, error = %self.0.message, "Request rejected");
        }

        let body = ApiErrorResponse {
            error: error_code.to_string(),
            message,
            details: None,
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn test_domain_kinds_map_to_statuses() {
        assert_eq!(status_of(AppError::checksum_mismatch("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AppError::duplicate_content("x")), StatusCode::CONFLICT);
        assert_eq!(status_of(AppError::not_owned("x")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(AppError::no_derivable_assets("x")), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(AppError::range_not_satisfiable("x")),
            StatusCode::RANGE_NOT_SATISFIABLE
        );
        assert_eq!(status_of(AppError::authentication("x")), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(AppError::ledger_query("x")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_owned_is_indistinguishable_from_not_found() {
        let owned = ApiError(AppError::not_owned("User u does not own f")).classify();
        let missing = ApiError(AppError::not_found("Content missing at u/f")).classify();
        assert_eq!(owned, missing);
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let (_, code, message) =
            ApiError(AppError::database("relation \"files\" does not exist")).classify();
        assert_eq!(code, "INTERNAL_ERROR");
        assert!(!message.contains("files"));
    }
}
