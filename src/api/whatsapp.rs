use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::AppState;
use crate::models::analytics::EventType;
use crate::services::access::open_share;
use crate::services::analytics::record_event_from;
use crate::services::whatsapp::{
    INVALID_CODE_REPLY, IncomingText, NO_CODE_REPLY, WebhookPayload, compose_reply,
    extract_share_id,
};
use crate::utils::error::{AppError, AppResult};

#[derive(Deserialize)]
struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

async fn verify_webhook(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VerifyQuery>,
) -> AppResult<String> {
    let expected = state.config.whatsapp.verify_token.as_deref();

    match (query.mode.as_deref(), query.verify_token.as_deref(), expected) {
        (Some("subscribe"), Some(given), Some(expected)) if given == expected => {
            tracing::info!("WhatsApp webhook verified");
            Ok(query.challenge.unwrap_or_default())
        }
        _ => Err(AppError::Forbidden("Webhook verification failed".to_string())),
    }
}

async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WebhookPayload>,
) -> AppResult<StatusCode> {
    if !payload.is_business_account() {
        return Err(AppError::NotFound("Unsupported webhook object".to_string()));
    }

    for text in payload.incoming_texts() {
        answer(&state, &text).await?;
    }

    Ok(StatusCode::OK)
}

async fn answer(state: &AppState, text: &IncomingText) -> AppResult<()> {
    let Some(share_id) = extract_share_id(&text.body) else {
        state.whatsapp.send_text(&text.from, NO_CODE_REPLY).await?;
        return Ok(());
    };

    let share = match open_share(&state.store, &share_id).await {
        Ok(share) => share,
        Err(AppError::NotFound(_) | AppError::Gone(_)) => {
            state.whatsapp.send_text(&text.from, INVALID_CODE_REPLY).await?;
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    record_event_from(
        &state.store,
        EventType::WaInbound,
        &share.share_id,
        Some("whatsapp".to_string()),
        Some(text.from.clone()),
    )
    .await;

    let share_page = format!("{}/share/{}", state.config.base_url, share.share_id);
    let zip_link = format!("{}/api/download/{}/zip", state.config.base_url, share.share_id);
    let reply = compose_reply(
        text.name.as_deref(),
        &share_page,
        &zip_link,
        share.requires_password(),
    );
    state.whatsapp.send_text(&text.from, &reply).await?;

    record_event_from(
        &state.store,
        EventType::WaAutoReply,
        &share.share_id,
        Some("whatsapp".to_string()),
        Some(text.from.clone()),
    )
    .await;

    tracing::info!("Answered WhatsApp request for share {}", share.share_id);
    Ok(())
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .with_state(state)
}
