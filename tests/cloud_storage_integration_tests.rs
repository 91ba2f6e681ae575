//! Integration tests for the Cloudinary image store against a mock server

use hotel::config::{StorageConfig, StorageProvider};
use hotel::storage::{CloudinaryStore, ImageStore, ImageUpload, StorageError, upload_all};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> StorageConfig {
    StorageConfig {
        provider: StorageProvider::Cloudinary,
        base_url: server.uri(),
        cloud_name: Some("demo".to_string()),
        api_key: Some("123456".to_string()),
        api_secret: Some("shhh".to_string()),
        folder: "hotel".to_string(),
        max_upload_bytes: 1024,
        timeout_seconds: 5,
    }
}

fn png(name: &str) -> ImageUpload {
    ImageUpload {
        file_name: name.to_string(),
        content_type: Some("image/png".to_string()),
        bytes: b"PNG fake image".to_vec(),
    }
}

#[tokio::test]
async fn uploads_signed_multipart_and_returns_secure_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1_1/demo/image/upload"))
        .and(body_string_contains("name=\"api_key\""))
        .and(body_string_contains("name=\"signature\""))
        .and(body_string_contains("sha256"))
        .and(body_string_contains("hotel/proofs/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "public_id": "hotel/proofs/abc/receipt",
            "url": "http://res.cloudinary.com/demo/image/upload/receipt.png",
            "secure_url": "https://res.cloudinary.com/demo/image/upload/receipt.png",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = CloudinaryStore::from_config(&config(&server)).unwrap();
    let stored = store
        .upload("hotel/proofs/abc", png("receipt.png"))
        .await
        .unwrap();

    assert_eq!(
        stored.url,
        "https://res.cloudinary.com/demo/image/upload/receipt.png"
    );
    assert_eq!(stored.public_id, "hotel/proofs/abc/receipt");
}

#[tokio::test]
async fn upstream_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": { "message": "Invalid Signature" } })),
        )
        .mount(&server)
        .await;

    let store = CloudinaryStore::from_config(&config(&server)).unwrap();
    let err = store.upload("hotel", png("a.png")).await.unwrap_err();

    match err {
        StorageError::Upstream { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid Signature");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn oversized_or_non_image_files_never_leave_the_process() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = CloudinaryStore::from_config(&config(&server)).unwrap();

    let mut big = png("big.png");
    big.bytes = vec![0; 2048];
    assert!(matches!(
        store.upload("hotel", big).await,
        Err(StorageError::Rejected { .. })
    ));

    let mut text = png("notes.txt");
    text.content_type = Some("text/plain".to_string());
    assert!(matches!(
        store.upload("hotel", text).await,
        Err(StorageError::Rejected { .. })
    ));
}

#[tokio::test]
async fn batch_upload_keeps_going_after_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("filename=\"bad.png\""))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("filename=\"good.png\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "public_id": "hotel/good",
            "secure_url": "https://res.cloudinary.com/demo/good.png",
        })))
        .mount(&server)
        .await;

    let store = CloudinaryStore::from_config(&config(&server)).unwrap();
    let report = upload_all(&store, "hotel", vec![png("bad.png"), png("good.png")]).await;

    assert_eq!(report.urls, vec!["https://res.cloudinary.com/demo/good.png"]);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].starts_with("Failed to upload bad.png"));
    assert!(report.warnings[0].contains("boom"));
}
