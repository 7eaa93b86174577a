//! Health check handler.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::dto::response::HealthResponse;
use crate::state::AppState;

/// GET /health: liveness plus database and storage checks
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.files.health_check().await.unwrap_or(false);
    let storage = state.content.health_check().await.unwrap_or(false);
    let healthy = database && storage;

    let status = if healthy {
        StatusCode::OK
    } else {
        tracing::warn!(database, storage, "Health check degraded");
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if healthy { "ok" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: if database { "connected" } else { "unavailable" }.to_string(),
            storage: if storage { "available" } else { "unavailable" }.to_string(),
        }),
    )
}
