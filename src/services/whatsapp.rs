use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::utils::config::WhatsAppConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::helpers::encode_uri_component;

pub const GRAPH_API_BASE: &str = "https://graph.facebook.com/v20.0";
pub const BUSINESS_ACCOUNT_OBJECT: &str = "whatsapp_business_account";

pub const NO_CODE_REPLY: &str =
    "Thanks for contacting us. Please send your code or scan our QR again.";
pub const INVALID_CODE_REPLY: &str = "This code is invalid or expired. Please request a new QR.";

static SHARE_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)SHARE\s+([A-Za-z0-9_-]{6,})").expect("share code pattern is valid")
});

/// Pulls a share id out of free text such as `"Hi\nSHARE abc123def456"`.
pub fn extract_share_id(text: &str) -> Option<String> {
    SHARE_CODE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn compose_reply(
    contact_name: Option<&str>,
    share_page: &str,
    zip_link: &str,
    requires_password: bool,
) -> String {
    let greeting = match contact_name.filter(|n| !n.is_empty()) {
        Some(name) => format!("Hi {}!", name),
        None => "Hi!".to_string(),
    };

    if requires_password {
        format!(
            "{}\nYour documents are ready.\nOpen: {}\nIf prompted, enter your password.\nYou can also download all files as ZIP here: {}",
            greeting, share_page, zip_link
        )
    } else {
        format!(
            "{}\nYour documents are ready.\nOpen: {}\nOr download all files as ZIP: {}",
            greeting, share_page, zip_link
        )
    }
}

/// `wa.me` link that opens a chat with the share code already typed in.
pub fn deep_link(business_number: Option<&str>, share_id: &str, share_page: &str) -> String {
    let text = encode_uri_component(&format!("Hi\nSHARE {}\n{}", share_id, share_page));
    match business_number.filter(|n| !n.is_empty()) {
        Some(number) => format!("https://wa.me/{}?text={}", number, text),
        None => format!("https://wa.me/?text={}", text),
    }
}

// Inbound webhook payload, reduced to the fields we read.

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub value: WebhookValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookValue {
    #[serde(default)]
    pub contacts: Vec<WebhookContact>,
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookContact {
    pub wa_id: Option<String>,
    pub profile: Option<ContactProfile>,
}

#[derive(Debug, Deserialize)]
pub struct ContactProfile {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub from: String,
    pub profile: Option<ContactProfile>,
    pub text: Option<TextBody>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

/// A text message together with the sender's display name, if known.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingText {
    pub from: String,
    pub name: Option<String>,
    pub body: String,
}

impl WebhookPayload {
    pub fn is_business_account(&self) -> bool {
        self.object.as_deref() == Some(BUSINESS_ACCOUNT_OBJECT)
    }

    pub fn incoming_texts(&self) -> Vec<IncomingText> {
        let mut texts = Vec::new();
        for change in self.entry.iter().flat_map(|e| &e.changes) {
            for message in &change.value.messages {
                let name = message
                    .profile
                    .as_ref()
                    .and_then(|p| p.name.clone())
                    .or_else(|| {
                        change
                            .value
                            .contacts
                            .iter()
                            .find(|c| c.wa_id.as_deref() == Some(message.from.as_str()))
                            .and_then(|c| c.profile.as_ref())
                            .and_then(|p| p.name.clone())
                    });

                texts.push(IncomingText {
                    from: message.from.clone(),
                    name,
                    body: message
                        .text
                        .as_ref()
                        .map(|t| t.body.clone())
                        .unwrap_or_default(),
                });
            }
        }
        texts
    }
}

#[derive(Debug, Serialize)]
struct OutboundText<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct OutboundDocument<'a> {
    link: &'a str,
    filename: &'a str,
}

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<OutboundText<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<OutboundDocument<'a>>,
}

/// Graph API messaging client. Credentials are checked per send so the
/// server can run without them.
#[derive(Debug, Clone)]
pub struct WhatsAppClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    phone_number_id: Option<String>,
}

impl WhatsAppClient {
    pub fn new(config: &WhatsAppConfig) -> Self {
        Self::with_base_url(config, GRAPH_API_BASE)
    }

    pub fn with_base_url(config: &WhatsAppConfig, base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            phone_number_id: config.phone_number_id.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some() && self.phone_number_id.is_some()
    }

    pub async fn send_text(&self, to: &str, body: &str) -> AppResult<serde_json::Value> {
        self.send(&OutboundMessage {
            messaging_product: "whatsapp",
            to,
            kind: "text",
            text: Some(OutboundText { body }),
            document: None,
        })
        .await
    }

    pub async fn send_document(
        &self,
        to: &str,
        link: &str,
        filename: &str,
    ) -> AppResult<serde_json::Value> {
        self.send(&OutboundMessage {
            messaging_product: "whatsapp",
            to,
            kind: "document",
            text: None,
            document: Some(OutboundDocument { link, filename }),
        })
        .await
    }

    async fn send(&self, message: &OutboundMessage<'_>) -> AppResult<serde_json::Value> {
        let (Some(token), Some(phone_number_id)) = (&self.token, &self.phone_number_id) else {
            return Err(AppError::Internal(
                "Missing WHATSAPP_TOKEN or WHATSAPP_PHONE_NUMBER_ID".to_string(),
            ));
        };

        let url = format!("{}/{}/messages", self.base_url, phone_number_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(message)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("WhatsApp request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "WhatsApp {} failed: {} {}",
                message.kind, status, text
            )));
        }

        tracing::debug!("WhatsApp {} sent to {}", message.kind, message.to);

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Invalid WhatsApp response: {}", e)))
    }
}
