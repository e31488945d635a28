use anyhow::Context;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://database.db?mode=rwc";
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
pub const DEFAULT_EXPIRATION_DAYS: i64 = 7;

#[derive(Debug, Clone, Default)]
pub struct WhatsAppConfig {
    /// Business number in international format without the leading `+`.
    pub business_number: Option<String>,
    pub token: Option<String>,
    pub phone_number_id: Option<String>,
    pub verify_token: Option<String>,
    /// When set, QR codes point at `/w/:shareId` instead of the share page.
    pub deeplink_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub base_url: String,
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub public_dir: PathBuf,
    pub max_file_size: u64,
    pub default_expiration_days: i64,
    pub rate_limit_window: Duration,
    /// Requests allowed per window; 0 turns rate limiting off.
    pub rate_limit_max_requests: u32,
    pub cleanup_interval: Duration,
    /// Record the first `X-Forwarded-For` hop instead of the socket peer.
    pub trust_proxy: bool,
    pub environment: String,
    pub whatsapp: WhatsAppConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port: u16 = parse_or(&var, "PORT", 3000)?;
        let base_url = var("RENDER_EXTERNAL_URL")
            .or_else(|| var("BASE_URL"))
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let whatsapp = WhatsAppConfig {
            business_number: var("WHATSAPP_BUSINESS_NUMBER"),
            token: var("WHATSAPP_TOKEN"),
            phone_number_id: var("WHATSAPP_PHONE_NUMBER_ID"),
            verify_token: var("WHATSAPP_VERIFY_TOKEN"),
            deeplink_enabled: var("WHATSAPP_DEEPLINK_ENABLED")
                .is_some_and(|v| v.eq_ignore_ascii_case("true")),
        };

        Ok(Self {
            port,
            base_url: base_url.trim_end_matches('/').to_string(),
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            upload_dir: var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            public_dir: var("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./public")),
            max_file_size: parse_or(&var, "MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE)?,
            default_expiration_days: parse_or(
                &var,
                "DEFAULT_EXPIRATION_DAYS",
                DEFAULT_EXPIRATION_DAYS,
            )?,
            rate_limit_window: Duration::from_millis(parse_or(
                &var,
                "RATE_LIMIT_WINDOW_MS",
                900_000,
            )?),
            rate_limit_max_requests: parse_or(&var, "RATE_LIMIT_MAX_REQUESTS", 100)?,
            cleanup_interval: Duration::from_secs(parse_or(&var, "CLEANUP_INTERVAL_SECS", 3600)?),
            trust_proxy: var("TRUST_PROXY").is_some_and(|v| v.eq_ignore_ascii_case("true")),
            environment: var("APP_ENV").unwrap_or_else(|| "production".to_string()),
            whatsapp,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
