//! Upload endpoint behavior.

mod helpers;

use axum::http::StatusCode;
use helpers::{BASE_URL, MultipartForm, TestApp};

#[tokio::test]
async fn upload_creates_share_with_qr_code() {
    let app = TestApp::new().await;

    let receipt = app
        .upload_sample(&[("brandName", "Acme Legal"), ("language", "es")])
        .await;

    assert_eq!(receipt["success"], true);
    assert_eq!(receipt["fileCount"], 2);
    assert_eq!(receipt["totalSize"], 34);

    let share_id = receipt["shareId"].as_str().unwrap();
    assert_eq!(share_id.len(), 12);
    assert!(
        share_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    );
    assert_eq!(
        receipt["shareUrl"].as_str().unwrap(),
        format!("{}/share/{}", BASE_URL, share_id)
    );
    assert!(
        receipt["qrCode"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,")
    );
    assert_eq!(receipt["files"][0]["name"], "a.pdf");
    assert_eq!(receipt["files"][0]["type"], "application/pdf");
    assert_eq!(receipt["files"][1]["size"], 20);

    assert_eq!(app.count_rows("shares").await, 1);
    assert_eq!(app.count_rows("files").await, 2);
    assert_eq!(app.stored_file_count(), 2);
}

#[tokio::test]
async fn deeplink_mode_points_qr_at_redirect() {
    let app = TestApp::with_env(&[("WHATSAPP_DEEPLINK_ENABLED", "true")]).await;

    let receipt = app.upload_sample(&[]).await;
    let share_id = receipt["shareId"].as_str().unwrap();
    assert_eq!(
        receipt["shareUrl"].as_str().unwrap(),
        format!("{}/w/{}", BASE_URL, share_id)
    );
}

#[tokio::test]
async fn upload_without_files_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .upload(MultipartForm::new().text("brandName", "Nobody"))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.count_rows("shares").await, 0);
}

#[tokio::test]
async fn non_multipart_body_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .post_json("/api/upload", serde_json::json!({ "files": [] }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn disallowed_type_rolls_back_whole_batch() {
    let app = TestApp::new().await;

    let response = app
        .upload(
            MultipartForm::new()
                .file("ok.pdf", "application/pdf", b"fine")
                .file("run.exe", "application/x-msdownload", b"MZ"),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "validation_error");
    assert_eq!(app.count_rows("shares").await, 0);
    assert_eq!(app.count_rows("files").await, 0);
    assert_eq!(app.stored_file_count(), 0);
}

#[tokio::test]
async fn oversized_file_is_rejected_and_removed() {
    let app = TestApp::with_env(&[("MAX_FILE_SIZE", "1024")]).await;

    let response = app
        .upload(
            MultipartForm::new()
                .file("small.pdf", "application/pdf", b"tiny")
                .file("big.pdf", "application/pdf", &vec![b'x'; 4096]),
        )
        .await;

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(app.count_rows("shares").await, 0);
    assert_eq!(app.stored_file_count(), 0);
}

#[tokio::test]
async fn more_than_twenty_files_is_rejected() {
    let app = TestApp::new().await;

    let mut form = MultipartForm::new();
    for i in 0..21 {
        form = form.file(&format!("{}.png", i), "image/png", b"png");
    }
    let response = app.upload(form).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.count_rows("files").await, 0);
    assert_eq!(app.stored_file_count(), 0);
}

#[tokio::test]
async fn invalid_expiration_is_rejected() {
    let app = TestApp::new().await;

    for value in ["-1", "forever"] {
        let response = app
            .upload(
                MultipartForm::new()
                    .text("expirationDays", value)
                    .file("a.pdf", "application/pdf", b"a"),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", value);
    }

    assert_eq!(app.count_rows("shares").await, 0);
    assert_eq!(app.stored_file_count(), 0);
}

#[tokio::test]
async fn mime_parameters_are_accepted() {
    let app = TestApp::new().await;

    let response = app
        .upload(MultipartForm::new().file(
            "clip.mp4",
            "video/mp4; codecs=avc1",
            b"\x00\x00\x00\x18ftyp",
        ))
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    assert_eq!(response.json()["files"][0]["type"], "video/mp4");
}
