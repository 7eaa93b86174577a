//! `Range` header extractor.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use aurelion_core::types::RangeRequest;

/// The request's single byte range, if it sent a usable one.
///
/// Malformed or multi-range values are treated as absent and the full body
/// is served.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteRangeHeader(pub Option<RangeRequest>);

impl<S: Send + Sync> FromRequestParts<S> for ByteRangeHeader {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .headers
                .get(header::RANGE)
                .and_then(|v| v.to_str().ok())
                .and_then(RangeRequest::parse),
        ))
    }
}
