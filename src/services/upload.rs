use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::DbStore;
use crate::models::file::NewSharedFile;
use crate::models::share::NewShare;
use crate::services::file_storage::{FileStorage, StoredFile};
use crate::services::file_validation::validate_file_count;
use crate::services::qr::generate_qr_data_url;
use crate::utils::config::AppConfig;
use crate::utils::crypto::hash_password;
use crate::utils::error::{AppError, AppResult};
use crate::utils::token::{DEFAULT_SHARE_ID_LENGTH, calculate_expiration, generate_share_id};

pub const DEFAULT_BRAND_NAME: &str = "QR Document Delivery";
pub const DEFAULT_LANGUAGE: &str = "en";
const SHARE_ID_ATTEMPTS: usize = 3;

/// Optional form fields accompanying an upload.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub expiration_days: Option<i64>,
    pub password: Option<String>,
    pub brand_name: Option<String>,
    pub language: Option<String>,
}

/// Files of one upload that are already on disk but not yet recorded.
/// Whatever happens, the batch ends either recorded or discarded.
#[derive(Debug)]
pub struct StagedBatch {
    storage: FileStorage,
    files: Vec<StoredFile>,
}

impl StagedBatch {
    pub fn new(storage: FileStorage) -> Self {
        Self {
            storage,
            files: Vec::new(),
        }
    }

    pub fn push(&mut self, file: StoredFile) {
        self.files.push(file);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &[StoredFile] {
        &self.files
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Deletes every stored file of the batch.
    pub async fn discard(self) {
        if !self.files.is_empty() {
            tracing::info!("Rolling back {} uploaded files", self.files.len());
        }
        for file in &self.files {
            self.storage.remove(&file.stored_name).await;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFileSummary {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub success: bool,
    pub share_id: String,
    pub share_url: String,
    pub qr_code: String,
    pub expires_at: DateTime<Utc>,
    pub file_count: usize,
    pub total_size: u64,
    pub files: Vec<UploadedFileSummary>,
}

/// Public URL a QR code points at.
pub fn build_share_url(config: &AppConfig, share_id: &str) -> String {
    if config.whatsapp.deeplink_enabled {
        format!("{}/w/{}", config.base_url, share_id)
    } else {
        format!("{}/share/{}", config.base_url, share_id)
    }
}

/// Records a staged batch as a new share. Any failure discards the batch's
/// bytes before the error is returned.
pub async fn publish_batch(
    store: &DbStore,
    config: &AppConfig,
    batch: StagedBatch,
    options: UploadOptions,
) -> AppResult<UploadReceipt> {
    match record_batch(store, config, &batch, options).await {
        Ok(receipt) => Ok(receipt),
        Err(e) => {
            batch.discard().await;
            Err(e)
        }
    }
}

async fn record_batch(
    store: &DbStore,
    config: &AppConfig,
    batch: &StagedBatch,
    options: UploadOptions,
) -> AppResult<UploadReceipt> {
    validate_file_count(batch.len())?;

    let expiration_days = options
        .expiration_days
        .unwrap_or(config.default_expiration_days);
    let expires_at = calculate_expiration(expiration_days)?;
    let password_hash = hash_password(options.password.as_deref())?;
    let brand_name = options
        .brand_name
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BRAND_NAME.to_string());
    let language = options
        .language
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    let share_id = insert_share(store, expires_at, password_hash, brand_name, language).await?;

    for file in batch.files() {
        store
            .add_file(&NewSharedFile {
                share_id: share_id.clone(),
                original_name: file.original_name.clone(),
                stored_name: file.stored_name.clone(),
                file_size: i64::try_from(file.size)
                    .map_err(|_| AppError::Internal("File size overflow".to_string()))?,
                mime_type: file.mime_type.clone(),
            })
            .await?;
    }

    let share_url = build_share_url(config, &share_id);
    let qr_code = generate_qr_data_url(&share_url)?;

    tracing::info!(
        "Share created: id={}, files={}, total={} bytes, expires_at={}, protected={}",
        share_id,
        batch.len(),
        batch.total_size(),
        expires_at,
        options.password.as_deref().is_some_and(|p| !p.is_empty())
    );

    Ok(UploadReceipt {
        success: true,
        share_id,
        share_url,
        qr_code,
        expires_at,
        file_count: batch.len(),
        total_size: batch.total_size(),
        files: batch
            .files()
            .iter()
            .map(|f| UploadedFileSummary {
                name: f.original_name.clone(),
                size: f.size,
                mime_type: f.mime_type.clone(),
            })
            .collect(),
    })
}

/// Inserts the share under a fresh id, drawing a new one if the first
/// collides with an existing share.
async fn insert_share(
    store: &DbStore,
    expires_at: DateTime<Utc>,
    password_hash: Option<String>,
    brand_name: String,
    language: String,
) -> AppResult<String> {
    let mut attempt = 1;
    loop {
        let share = NewShare::new(
            generate_share_id(DEFAULT_SHARE_ID_LENGTH),
            Some(expires_at),
            password_hash.clone(),
            Some(brand_name.clone()),
            language.clone(),
        );

        match store.create_share(&share).await {
            Ok(_) => return Ok(share.share_id),
            Err(e) if e.is_unique_violation() && attempt < SHARE_ID_ATTEMPTS => {
                tracing::warn!("Share id collision on attempt {}, retrying", attempt);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
