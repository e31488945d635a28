use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::api::AppState;
use crate::models::analytics::EventType;
use crate::models::file::FileResponse;
use crate::services::access::{check_password, find_file, open_share, unlock_share};
use crate::services::analytics::record_event;
use crate::services::archive::{archive_entries, stream_archive};
use crate::utils::error::{AppError, AppResult};
use crate::utils::helpers::{ClientInfo, attachment_disposition};

#[derive(Deserialize)]
struct PasswordQuery {
    password: Option<String>,
}

#[derive(Deserialize)]
struct VerifyRequest {
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShareInfo {
    success: bool,
    brand_name: Option<String>,
    language: String,
    requires_password: bool,
    file_count: usize,
    files: Vec<FileResponse>,
}

async fn share_info(
    State(state): State<Arc<AppState>>,
    Path(share_id): Path<String>,
    client: ClientInfo,
) -> AppResult<Json<ShareInfo>> {
    let share = open_share(&state.store, &share_id).await?;
    let files = state.store.get_files(&share_id).await?;

    record_event(&state.store, EventType::PageView, &share_id, &client).await;

    Ok(Json(ShareInfo {
        success: true,
        brand_name: share.brand_name.clone(),
        language: share.language.clone(),
        requires_password: share.requires_password(),
        file_count: files.len(),
        files: files.into_iter().map(FileResponse::from).collect(),
    }))
}

async fn verify(
    State(state): State<Arc<AppState>>,
    Path(share_id): Path<String>,
    body: Option<Json<VerifyRequest>>,
) -> AppResult<Json<serde_json::Value>> {
    // A missing or unreadable body counts as no password.
    let password = body.and_then(|Json(req)| req.password);
    check_password(&state.store, &share_id, password.as_deref()).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn download_zip(
    State(state): State<Arc<AppState>>,
    Path(share_id): Path<String>,
    Query(query): Query<PasswordQuery>,
    client: ClientInfo,
) -> AppResult<Response> {
    let share = unlock_share(&state.store, &share_id, query.password.as_deref()).await?;
    let files = state.store.get_files(&share.share_id).await?;
    if files.is_empty() {
        return Err(AppError::NotFound("No files found".to_string()));
    }

    record_event(&state.store, EventType::DownloadZip, &share_id, &client).await;
    tracing::info!("ZIP download for share {} ({} files)", share_id, files.len());

    let entries = archive_entries(&state.storage, &files);
    let disposition = format!("attachment; filename=\"files-{}.zip\"", share_id);

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        stream_archive(entries),
    )
        .into_response())
}

async fn download_file(
    State(state): State<Arc<AppState>>,
    Path((share_id, file_id)): Path<(String, String)>,
    Query(query): Query<PasswordQuery>,
    client: ClientInfo,
) -> AppResult<Response> {
    let share = unlock_share(&state.store, &share_id, query.password.as_deref()).await?;

    let file_id: i64 = file_id
        .parse()
        .map_err(|_| AppError::NotFound("File not found".to_string()))?;
    let file = find_file(state.store.get_files(&share.share_id).await?, file_id)?;

    let path = state.storage.path_of(&file.stored_name);
    let handle = tokio::fs::File::open(&path).await.map_err(|e| {
        tracing::warn!("Stored bytes missing for file {} ({:?}): {}", file.id, path, e);
        AppError::NotFound("File not found".to_string())
    })?;
    let length = handle
        .metadata()
        .await
        .map(|m| m.len())
        .map_err(|e| AppError::Internal(format!("Failed to stat file: {}", e)))?;

    record_event(&state.store, EventType::DownloadFile, &share_id, &client).await;

    Ok((
        [
            (header::CONTENT_TYPE, file.mime_type.clone()),
            (header::CONTENT_DISPOSITION, attachment_disposition(&file.original_name)),
            (header::CONTENT_LENGTH, length.to_string()),
        ],
        Body::from_stream(ReaderStream::new(handle)),
    )
        .into_response())
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/:share_id", get(share_info))
        .route("/:share_id/verify", post(verify))
        .route("/:share_id/zip", get(download_zip))
        .route("/:share_id/file/:file_id", get(download_file))
        .with_state(state)
}
