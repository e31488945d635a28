use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use std::sync::Arc;

use crate::api::AppState;
use crate::services::analytics::share_analytics;
use crate::utils::error::{AppError, AppResult};

async fn get_analytics(
    State(state): State<Arc<AppState>>,
    Path(share_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let share = state
        .store
        .get_share(&share_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Share not found".to_string()))?;

    let analytics = share_analytics(&state.store, &share).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "analytics": analytics,
    })))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/:share_id", get(get_analytics))
        .with_state(state)
}
