use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::utils::error::{AppError, AppResult};

pub const DEFAULT_SHARE_ID_LENGTH: usize = 12;

/// Random URL-safe identifier of exactly `length` characters.
pub fn generate_share_id(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    OsRng.fill_bytes(&mut bytes);

    let mut id = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&bytes);
    id.truncate(length);
    id
}

pub fn calculate_expiration(days: i64) -> AppResult<DateTime<Utc>> {
    expiration_from(Utc::now(), days)
}

pub fn expiration_from(now: DateTime<Utc>, days: i64) -> AppResult<DateTime<Utc>> {
    if days < 0 {
        return Err(AppError::Validation(
            "Expiration days cannot be negative".to_string(),
        ));
    }

    Duration::try_days(days)
        .and_then(|d| now.checked_add_signed(d))
        .ok_or_else(|| AppError::Validation(format!("Expiration of {} days is out of range", days)))
}
