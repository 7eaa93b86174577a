//! Custom Axum extractors.

pub mod auth;
pub mod range;

pub use auth::AuthUser;
pub use range::ByteRangeHeader;
