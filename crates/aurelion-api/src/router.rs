//! Route definitions for the Aurelion HTTP API.
//!
//! The router receives `AppState` and passes it to all handlers via Axum's
//! `State` extractor.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::middleware::cors::build_cors_layer;
use crate::state::AppState;

/// Room for multipart boundaries and metadata fields on top of the file.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_body = usize::try_from(state.config.storage.max_upload_size_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);
    let cors = build_cors_layer(&state.config.server.cors);

    Router::new()
        .merge(file_routes())
        .merge(thumbnail_routes())
        .route("/health", get(handlers::health::health))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Upload, listing, state, sync, streaming, delete
fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/files", get(handlers::file::list_files))
        .route("/files/upload", post(handlers::file::upload))
        .route("/files/state", get(handlers::file::state_digest))
        .route("/files/sync", get(handlers::file::sync))
        .route("/files/{id}", delete(handlers::file::delete_file))
        .route("/files/{id}/stream", get(handlers::file::stream))
}

/// Single and batch thumbnails
fn thumbnail_routes() -> Router<AppState> {
    Router::new()
        .route("/files/thumbnails/batch", post(handlers::thumbnail::batch))
        .route("/files/{id}/thumbnail", get(handlers::thumbnail::thumbnail))
}
