use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::database::DbStore;
use crate::models::analytics::{EventType, NewAccessEvent};
use crate::models::share::Share;
use crate::utils::error::AppResult;
use crate::utils::helpers::ClientInfo;

/// Records an access event without letting a failure reach the caller.
pub async fn record_event(store: &DbStore, event_type: EventType, share_id: &str, client: &ClientInfo) {
    record_event_from(
        store,
        event_type,
        share_id,
        client.user_agent.clone(),
        client.ip_address.clone(),
    )
    .await;
}

pub async fn record_event_from(
    store: &DbStore,
    event_type: EventType,
    share_id: &str,
    user_agent: Option<String>,
    ip_address: Option<String>,
) {
    let event = NewAccessEvent::new(event_type, share_id.to_string(), user_agent, ip_address);

    if let Err(e) = store.track_event(&event).await {
        tracing::warn!(
            "Failed to record {} event for share {}: {}",
            event_type.as_str(),
            share_id,
            e
        );
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStats {
    pub count: i64,
    pub last_event: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareAnalytics {
    pub share_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub events: BTreeMap<String, EventStats>,
}

pub async fn share_analytics(store: &DbStore, share: &Share) -> AppResult<ShareAnalytics> {
    let summaries = store.get_analytics(&share.share_id).await?;

    let events = summaries
        .into_iter()
        .map(|summary| {
            (
                summary.event_type,
                EventStats {
                    count: summary.count,
                    last_event: summary.last_event,
                },
            )
        })
        .collect();

    Ok(ShareAnalytics {
        share_id: share.share_id.clone(),
        created_at: share.created_at,
        expires_at: share.expires_at,
        events,
    })
}
