//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Request, Response, header};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use aurelion_api::{AppState, Backends, Claims, build_router};
use aurelion_core::config::AppConfig;
use aurelion_database::MemoryDatabase;
use aurelion_storage::LocalStorageProvider;
use aurelion_storage::thumbnail::{MediaTranscoder, ThumbnailSpec};

/// Secret shared between the test token issuer and the app.
pub const SECRET: &str = "integration-test-secret";

pub const BOUNDARY: &str = "aurelion-test-boundary";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// In-memory database backing the app
    pub db: MemoryDatabase,
    _dir: TempDir,
}

impl TestApp {
    /// Create a new test application
    pub async fn new() -> Self {
        Self::with_max_upload(16 * 1024 * 1024).await
    }

    /// Create a test application with a custom upload limit
    pub async fn with_max_upload(max_upload_size_bytes: u64) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let config: AppConfig = serde_json::from_value(json!({
            "database": { "url": "postgres://unused@localhost/aurelion" },
            "auth": { "jwt_secret": SECRET },
            "storage": {
                "root": dir.path().join("content").display().to_string(),
                "max_upload_size_bytes": max_upload_size_bytes,
            },
            "thumbnails": {
                "root": dir.path().join("thumbnails").display().to_string(),
                "workers": 2,
            },
        }))
        .expect("Failed to build test config");

        let content = Arc::new(
            LocalStorageProvider::new(&config.storage.root)
                .await
                .expect("Failed to init content storage"),
        );
        let thumbnails = Arc::new(
            LocalStorageProvider::new(&config.thumbnails.root)
                .await
                .expect("Failed to init thumbnail storage"),
        );
        let renderer = Arc::new(MediaTranscoder::new(ThumbnailSpec::from(&config.thumbnails)));

        let db = MemoryDatabase::new();
        let app_state = AppState::new(
            config,
            Backends {
                files: Arc::new(db.clone()),
                ledger: Arc::new(db.clone()),
                content,
                thumbnails,
                renderer,
            },
        );

        Self {
            router: build_router(app_state),
            db,
            _dir: dir,
        }
    }

    /// Mint a valid access token for `user_id`
    pub fn token(&self, user_id: Uuid) -> String {
        let claims = Claims {
            id: user_id,
            email: format!("{user_id}@test.com"),
            name: "Test User".to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("Failed to encode token")
    }

    /// Send a request through the router
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    /// GET `path` with an optional bearer token and extra headers
    pub async fn get(
        &self,
        path: &str,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> Response<Body> {
        let mut req = Request::builder().method("GET").uri(path);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        self.send(req.body(Body::empty()).expect("Failed to build request"))
            .await
    }

    /// DELETE `path`
    pub async fn delete(&self, path: &str, token: &str) -> Response<Body> {
        let req = Request::builder()
            .method("DELETE")
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(req).await
    }

    /// POST a JSON body
    pub async fn post_json(&self, path: &str, token: &str, body: Value) -> Response<Body> {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("Failed to build request");
        self.send(req).await
    }

    /// Upload `data` with a declared checksum
    pub async fn upload_with_checksum(
        &self,
        token: &str,
        data: &[u8],
        name: &str,
        mime: &str,
        checksum: &str,
    ) -> Response<Body> {
        let req = Request::builder()
            .method("POST")
            .uri("/files/upload")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header("x-sha256-checksum", checksum)
            .body(Body::from(multipart_body(data, name, mime)))
            .expect("Failed to build request");
        self.send(req).await
    }

    /// Upload `data` with its correct checksum and return the file id
    pub async fn upload(&self, token: &str, data: &[u8], name: &str, mime: &str) -> String {
        let checksum = sha256_hex(data);
        let response = self
            .upload_with_checksum(token, data, name, mime, &checksum)
            .await;
        let status = response.status();
        let body = json_body(response).await;
        assert!(status.is_success(), "Upload failed: {status} {body}");
        body["id"].as_str().expect("No id in upload response").to_string()
    }
}

/// Lowercase hex SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// A multipart form with metadata fields and one file part
pub fn multipart_body(data: &[u8], name: &str, mime: &str) -> Vec<u8> {
    let mut body = Vec::new();
    let fields = [
        ("mimeType", mime.to_string()),
        ("originalName", name.to_string()),
        ("creationDate", "2024-05-01T12:00:00Z".to_string()),
    ];
    for (field, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: {mime}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Collect a response body
pub async fn body_bytes(response: Response<Body>) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body")
}

/// Collect and parse a JSON response body
pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

/// A PNG of the given dimensions
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("Failed to encode PNG");
    out.into_inner()
}
