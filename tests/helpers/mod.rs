//! Shared helpers for the HTTP-level tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use qrshare::api::AppState;
use qrshare::database::{DbStore, SqliteShareStore};
use qrshare::server::build_router;
use qrshare::services::file_storage::FileStorage;
use qrshare::services::whatsapp::WhatsAppClient;
use qrshare::utils::config::AppConfig;

pub const BASE_URL: &str = "http://qr.test";
pub const VERIFY_TOKEN: &str = "verify-secret";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub db: Arc<SqliteShareStore>,
    upload_dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_env(&[]).await
    }

    pub async fn with_env(overrides: &[(&str, &str)]) -> Self {
        Self::build(overrides, None).await
    }

    /// Same as [`TestApp::with_env`], with outbound WhatsApp calls sent to
    /// `graph_base_url` instead of the Graph API.
    pub async fn with_whatsapp(overrides: &[(&str, &str)], graph_base_url: &str) -> Self {
        Self::build(overrides, Some(graph_base_url)).await
    }

    async fn build(overrides: &[(&str, &str)], graph_base_url: Option<&str>) -> Self {
        let upload_dir = tempfile::tempdir().expect("temp upload dir");

        let mut vars: HashMap<String, String> = HashMap::from([
            ("BASE_URL".to_string(), BASE_URL.to_string()),
            ("RATE_LIMIT_MAX_REQUESTS".to_string(), "0".to_string()),
            ("WHATSAPP_VERIFY_TOKEN".to_string(), VERIFY_TOKEN.to_string()),
            (
                "UPLOAD_DIR".to_string(),
                upload_dir.path().to_string_lossy().into_owned(),
            ),
            (
                "PUBLIC_DIR".to_string(),
                concat!(env!("CARGO_MANIFEST_DIR"), "/public").to_string(),
            ),
        ]);
        for (key, value) in overrides {
            vars.insert(key.to_string(), value.to_string());
        }

        let config = AppConfig::from_lookup(|key| vars.get(key).cloned()).expect("test config");

        let db = Arc::new(
            SqliteShareStore::connect("sqlite::memory:")
                .await
                .expect("in-memory database"),
        );
        let store: DbStore = db.clone();

        let whatsapp = match graph_base_url {
            Some(base_url) => WhatsAppClient::with_base_url(&config.whatsapp, base_url),
            None => WhatsAppClient::new(&config.whatsapp),
        };

        let state = Arc::new(AppState {
            store,
            storage: FileStorage::new(upload_dir.path()),
            whatsapp,
            config: Arc::new(config),
        });

        Self {
            router: build_router(state.clone()),
            state,
            db,
            upload_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> TestResponse {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn upload(&self, form: MultipartForm) -> TestResponse {
        let (content_type, body) = form.finish();
        self.send(
            Request::post("/api/upload")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    /// Uploads two small PDFs and returns the receipt.
    pub async fn upload_sample(&self, fields: &[(&str, &str)]) -> Value {
        let mut form = MultipartForm::new()
            .file("a.pdf", "application/pdf", b"%PDF-1.4 first")
            .file("b.pdf", "application/pdf", b"%PDF-1.4 second file");
        for (name, value) in fields {
            form = form.text(name, value);
        }

        let response = self.upload(form).await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text());
        response.json()
    }

    pub async fn count_events(&self, share_id: &str, event_type: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM analytics WHERE share_id = ? AND event_type = ?")
            .bind(share_id)
            .bind(event_type)
            .fetch_one(self.db.pool())
            .await
            .expect("event count query")
    }

    pub async fn count_rows(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(self.db.pool())
            .await
            .expect("count query")
    }

    pub fn stored_file_count(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path())
            .expect("upload dir readable")
            .count()
    }
}

/// Hand-built `multipart/form-data` body.
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: "qrshare-test-boundary-7d1f".to_string(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }
}
