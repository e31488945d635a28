pub mod analytics;
pub mod download;
pub mod share_page;
pub mod upload;
pub mod whatsapp;

use axum::{Json, Router, routing::get};
use chrono::Utc;
use std::sync::Arc;

use crate::database::DbStore;
use crate::services::file_storage::FileStorage;
use crate::services::whatsapp::WhatsAppClient;
use crate::utils::config::AppConfig;

pub struct AppState {
    pub store: DbStore,
    pub storage: FileStorage,
    pub config: Arc<AppConfig>,
    pub whatsapp: WhatsAppClient,
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Everything mounted under `/api`.
pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/upload", upload::routes(state.clone()))
        .nest("/download", download::routes(state.clone()))
        .nest("/analytics", analytics::routes(state.clone()))
        .nest("/whatsapp", whatsapp::routes(state))
}
