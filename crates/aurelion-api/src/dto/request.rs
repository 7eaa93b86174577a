//! Request DTOs with validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Metadata fields sent alongside an uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    /// Declared MIME type.
    #[validate(length(min = 1, max = 255, message = "mimeType is required"))]
    pub mime_type: String,
    /// Original filename.
    #[validate(length(min = 1, max = 1024, message = "originalName is required"))]
    pub original_name: String,
    /// Client-side creation timestamp.
    pub creation_date: DateTime<Utc>,
}

/// Query parameters of a sync pull.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncQuery {
    /// Last version the client applied.
    #[serde(default)]
    pub version: i64,
    /// Page size; the server default applies when absent.
    pub limit: Option<u32>,
}

/// Body of a thumbnail batch request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailBatchRequest {
    /// Files to include.
    #[validate(length(min = 1, max = 1000, message = "fileIds must list 1 to 1000 ids"))]
    pub file_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_metadata_requires_names() {
        let meta = UploadMetadata {
            mime_type: String::new(),
            original_name: "a.jpg".to_string(),
            creation_date: Utc::now(),
        };
        assert!(meta.validate().is_err());
    }

    #[test]
    fn test_batch_request_is_camel_case() {
        let req: ThumbnailBatchRequest =
            serde_json::from_str(r#"{"fileIds":["a","b"]}"#).expect("parse");
        assert_eq!(req.file_ids.len(), 2);
        assert!(req.validate().is_ok());

        let empty = ThumbnailBatchRequest { file_ids: vec![] };
        assert!(empty.validate().is_err());
    }
}
