//! Upload, listing, state, sync, streaming, and delete handlers.

use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use validator::Validate;

use aurelion_core::error::AppError;
use aurelion_core::types::ContentHash;
use aurelion_entity::sync::{StateDigest, SyncPage};
use aurelion_service::UploadParams;

use crate::dto::request::{SyncQuery, UploadMetadata};
use crate::dto::response::{DeleteResponse, FileListResponse, UploadResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, ByteRangeHeader};
use crate::state::AppState;

/// Header carrying the client's SHA-256 of the upload.
pub const CHECKSUM_HEADER: &str = "x-sha256-checksum";

/// POST /files/upload: multipart upload with a declared checksum
pub async fn upload(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let declared = headers
        .get(CHECKSUM_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::validation(format!("{CHECKSUM_HEADER} header is required")))?;
    // A malformed declared digest is reported as a checksum mismatch.
    let declared = ContentHash::parse(declared).map_err(|_| {
        AppError::checksum_mismatch(format!(
            "Declared checksum {declared:?} does not match received content"
        ))
    })?;

    let mut data: Option<Bytes> = None;
    let mut part_name: Option<String> = None;
    let mut part_type: Option<String> = None;
    let mut mime_type: Option<String> = None;
    let mut original_name: Option<String> = None;
    let mut creation_date: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                part_name = field.file_name().map(String::from);
                part_type = field.content_type().map(String::from);
                data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::validation(format!("Read error: {e}")))?,
                );
            }
            "mimeType" | "originalName" | "creationDate" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Read error: {e}")))?;
                match name.as_str() {
                    "mimeType" => mime_type = Some(text),
                    "originalName" => original_name = Some(text),
                    _ => creation_date = Some(text),
                }
            }
            _ => {}
        }
    }

    let data = data.ok_or_else(|| AppError::validation("file missing"))?;
    let creation_date = creation_date
        .ok_or_else(|| AppError::validation("creationDate is required"))
        .and_then(|raw| {
            DateTime::parse_from_rfc3339(raw.trim())
                .map(|d| d.with_timezone(&Utc))
                .map_err(|_| AppError::validation("creationDate must be an RFC 3339 timestamp"))
        })?;
    let metadata = UploadMetadata {
        mime_type: mime_type.or(part_type).unwrap_or_default(),
        original_name: original_name.or(part_name).unwrap_or_default(),
        creation_date,
    };
    metadata
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let file = state
        .store
        .store(
            &auth,
            UploadParams {
                data,
                filename: metadata.original_name,
                mime_type: metadata.mime_type,
                creation_date: metadata.creation_date,
                declared_checksum: declared,
            },
        )
        .await?;

    Ok(Json(UploadResponse {
        id: file.id.to_string(),
        checksum: file.id.to_string(),
        status: "processed".to_string(),
    }))
}

/// GET /files: every file the caller owns
pub async fn list_files(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<FileListResponse>, ApiError> {
    let items = state.store.list(&auth).await?;
    Ok(Json(FileListResponse {
        count: items.len(),
        items,
    }))
}

/// GET /files/state: fingerprint of the caller's file set
pub async fn state_digest(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<StateDigest>, ApiError> {
    Ok(Json(state.digest.digest(auth.user_id).await?))
}

/// GET /files/sync?version=&limit=: one page of the change ledger
pub async fn sync(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SyncQuery>,
) -> Result<Json<SyncPage>, ApiError> {
    let page = state
        .sync
        .pull(auth.user_id, query.version, query.limit)
        .await?;
    Ok(Json(page))
}

/// GET /files/{id}/stream: full or ranged content
pub async fn stream(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ByteRangeHeader(requested): ByteRangeHeader,
) -> Result<Response, ApiError> {
    let (file, total_size) = state.reader.stat(&auth, &id).await?;
    let range = match requested.map(|r| r.resolve(total_size)).transpose() {
        Ok(range) => range,
        Err(e) => return Ok(unsatisfiable(e, total_size)),
    };

    let read = state.reader.read(file, total_size, range).await?;
    let content_type = HeaderValue::from_str(&read.file.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, read.content_length());
    builder = match read.range {
        Some(range) => builder
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_RANGE, range.content_range(total_size)),
        None => builder.status(StatusCode::OK),
    };

    builder
        .body(Body::from_stream(read.body))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")).into())
}

/// DELETE /files/{id}
pub async fn delete_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = state.store.delete(&auth, &id).await?;
    Ok(Json(DeleteResponse {
        message: "File deleted successfully".to_string(),
        id: id.to_string(),
    }))
}

fn unsatisfiable(err: AppError, total_size: u64) -> Response {
    let mut response = ApiError(err).into_response();
    if let Ok(value) = HeaderValue::from_str(&format!("bytes */{total_size}")) {
        response.headers_mut().insert(header::CONTENT_RANGE, value);
    }
    response
}
