//! # aurelion-api
//!
//! HTTP API layer for Aurelion built on Axum.
//!
//! Provides the file, sync, and thumbnail endpoints, middleware (CORS,
//! request logging), extractors (bearer identity, byte ranges), DTOs, and
//! the mapping from [`AppError`](aurelion_core::AppError) to HTTP responses.

pub mod auth;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use auth::{Claims, TokenVerifier};
pub use error::ApiError;
pub use router::build_router;
pub use state::{AppState, Backends};
