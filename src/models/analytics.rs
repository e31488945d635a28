use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PageView,
    DownloadZip,
    DownloadFile,
    QrScan,
    WaRedirect,
    WaInbound,
    WaAutoReply,
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::PageView => "page_view",
            EventType::DownloadZip => "download_zip",
            EventType::DownloadFile => "download_file",
            EventType::QrScan => "qr_scan",
            EventType::WaRedirect => "wa_redirect",
            EventType::WaInbound => "wa_inbound",
            EventType::WaAutoReply => "wa_auto_reply",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAccessEvent {
    pub event_type: EventType,
    pub share_id: String,
    pub timestamp: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl NewAccessEvent {
    pub fn new(
        event_type: EventType,
        share_id: String,
        user_agent: Option<String>,
        ip_address: Option<String>,
    ) -> Self {
        Self {
            event_type,
            share_id,
            timestamp: Utc::now(),
            user_agent,
            ip_address,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventSummary {
    pub event_type: String,
    pub count: i64,
    pub last_event: Option<DateTime<Utc>>,
}
