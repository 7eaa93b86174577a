//! Thumbnail handlers.

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use validator::Validate;

use aurelion_core::error::AppError;
use aurelion_storage::layout::THUMBNAIL_MIME;

use crate::dto::request::ThumbnailBatchRequest;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// Filename of every batch archive.
pub const ARCHIVE_FILENAME: &str = "thumbnails.zip";

/// Response header naming the MIME type of the thumbnail's source file.
pub const SOURCE_TYPE_HEADER: &str = "x-source-content-type";

/// POST /files/thumbnails/batch: zip of thumbnails, streamed as produced
pub async fn batch(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<ThumbnailBatchRequest>,
) -> Result<Response, ApiError> {
    request
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let archive = state.thumbnails.batch(&auth, &request.file_ids).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{ARCHIVE_FILENAME}\""),
        )
        .body(Body::from_stream(archive))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")).into())
}

/// GET /files/{id}/thumbnail
pub async fn thumbnail(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let rendered = state.thumbnails.thumbnail(&auth, &id).await?;
    let source_type = HeaderValue::from_str(&rendered.file.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, THUMBNAIL_MIME)
        .header(SOURCE_TYPE_HEADER, source_type)
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .header(header::CONTENT_LENGTH, rendered.data.len())
        .body(Body::from(rendered.data))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")).into())
}
