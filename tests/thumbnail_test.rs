//! Integration tests for single and batch thumbnails.

mod helpers;

use std::io::Cursor;

use axum::http::{StatusCode, header};
use serde_json::json;
use uuid::Uuid;

use helpers::{TestApp, body_bytes, json_body, png};

#[tokio::test]
async fn test_batch_zips_only_derivable_files() {
    let app = TestApp::new().await;
    let token = app.token(Uuid::new_v4());

    let wide = app.upload(&token, &png(640, 480), "wide.png", "image/png").await;
    let tall = app.upload(&token, &png(120, 400), "tall.png", "image/png").await;
    let doc = app
        .upload(&token, b"%PDF-1.4 not an image", "doc.pdf", "application/pdf")
        .await;

    let response = app
        .post_json(
            "/files/thumbnails/batch",
            &token,
            json!({ "fileIds": [wide, tall, doc] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"thumbnails.zip\""
    );

    let bytes = body_bytes(response).await;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).expect("valid zip");
    assert_eq!(archive.len(), 2);

    let mut names: Vec<String> = archive.file_names().map(String::from).collect();
    names.sort();
    let mut expected = vec![format!("{wide}.jpg"), format!("{tall}.jpg")];
    expected.sort();
    assert_eq!(names, expected);

    let mut entry = archive.by_name(&format!("{wide}.jpg")).expect("entry");
    let mut jpeg = Vec::new();
    std::io::Read::read_to_end(&mut entry, &mut jpeg).expect("read entry");
    let thumb = image::load_from_memory(&jpeg).expect("decodable thumbnail");
    assert_eq!((thumb.width(), thumb.height()), (300, 300));
}

#[tokio::test]
async fn test_batch_of_non_media_is_not_found() {
    let app = TestApp::new().await;
    let token = app.token(Uuid::new_v4());
    let doc = app.upload(&token, b"plain text", "notes.txt", "text/plain").await;

    let response = app
        .post_json("/files/thumbnails/batch", &token, json!({ "fileIds": [doc] }))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "NO_DERIVABLE_ASSETS");
}

#[tokio::test]
async fn test_batch_with_foreign_id_is_rejected_up_front() {
    let app = TestApp::new().await;
    let owner = app.token(Uuid::new_v4());
    let stranger = app.token(Uuid::new_v4());
    let mine = app.upload(&stranger, &png(32, 32), "mine.png", "image/png").await;
    let theirs = app.upload(&owner, &png(48, 48), "theirs.png", "image/png").await;

    let response = app
        .post_json(
            "/files/thumbnails/batch",
            &stranger,
            json!({ "fileIds": [mine, theirs] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_batch_requires_ids() {
    let app = TestApp::new().await;
    let token = app.token(Uuid::new_v4());

    let response = app
        .post_json("/files/thumbnails/batch", &token, json!({ "fileIds": [] }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_single_thumbnail_is_jpeg_with_source_type() {
    let app = TestApp::new().await;
    let token = app.token(Uuid::new_v4());
    let id = app.upload(&token, &png(640, 480), "photo.png", "image/png").await;

    let response = app
        .get(&format!("/files/{id}/thumbnail"), Some(&token), &[])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(response.headers()["x-source-content-type"], "image/png");

    let first = body_bytes(response).await;
    let thumb = image::load_from_memory(&first).expect("decodable thumbnail");
    assert_eq!((thumb.width(), thumb.height()), (300, 300));

    let again = app
        .get(&format!("/files/{id}/thumbnail"), Some(&token), &[])
        .await;
    assert_eq!(body_bytes(again).await, first);
}

#[tokio::test]
async fn test_single_thumbnail_of_document_is_not_found() {
    let app = TestApp::new().await;
    let token = app.token(Uuid::new_v4());
    let id = app.upload(&token, b"%PDF-1.4", "doc.pdf", "application/pdf").await;

    let response = app
        .get(&format!("/files/{id}/thumbnail"), Some(&token), &[])
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
