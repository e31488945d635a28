use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;

use crate::api::AppState;
use crate::models::analytics::EventType;
use crate::models::share::Share;
use crate::services::analytics::record_event;
use crate::services::whatsapp::deep_link;
use crate::utils::helpers::ClientInfo;

const DOWNLOAD_PAGE: &str = include_str!("../../public/download.html");

/// Plain-text failure for browser-facing pages.
async fn lookup(state: &AppState, share_id: &str) -> Result<Share, Response> {
    match state.store.get_share(share_id).await {
        Ok(Some(share)) => Ok(share),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Share not found or expired").into_response()),
        Err(e) => {
            tracing::error!("Error loading share {}: {}", share_id, e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Error loading share").into_response())
        }
    }
}

async fn share_page(
    State(state): State<Arc<AppState>>,
    Path(share_id): Path<String>,
    client: ClientInfo,
) -> Response {
    if let Err(response) = lookup(&state, &share_id).await {
        return response;
    }

    record_event(&state.store, EventType::QrScan, &share_id, &client).await;
    Html(DOWNLOAD_PAGE).into_response()
}

async fn whatsapp_redirect(
    State(state): State<Arc<AppState>>,
    Path(share_id): Path<String>,
    client: ClientInfo,
) -> Response {
    let share = match lookup(&state, &share_id).await {
        Ok(share) => share,
        Err(response) => return response,
    };

    record_event(&state.store, EventType::WaRedirect, &share.share_id, &client).await;

    let share_page = format!("{}/share/{}", state.config.base_url, share.share_id);
    let target = deep_link(
        state.config.whatsapp.business_number.as_deref(),
        &share.share_id,
        &share_page,
    );

    (StatusCode::FOUND, [(header::LOCATION, target)]).into_response()
}

/// Browser-facing routes mounted at the root, outside the API rate limit.
pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/share/:share_id", get(share_page))
        .route("/w/:share_id", get(whatsapp_redirect))
        .with_state(state)
}
