use chrono::Utc;

use crate::database::DbStore;
use crate::models::file::SharedFile;
use crate::models::share::Share;
use crate::utils::crypto::verify_password;
use crate::utils::error::{AppError, AppResult};

/// Gate 1: the share exists and is active.
pub async fn resolve_share(store: &DbStore, share_id: &str) -> AppResult<Share> {
    store
        .get_share(share_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Share not found or expired".to_string()))
}

/// Gate 2: the share has not expired, whatever its active flag says.
pub fn ensure_not_expired(share: &Share) -> AppResult<()> {
    if share.is_expired_at(Utc::now()) {
        tracing::debug!("Share {} expired at {:?}", share.share_id, share.expires_at);
        return Err(AppError::Gone("Share has expired".to_string()));
    }
    Ok(())
}

/// Gate 3: a protected share needs the right password.
pub fn ensure_password(share: &Share, password: Option<&str>) -> AppResult<()> {
    if !share.requires_password() {
        return Ok(());
    }

    let Some(password) = password.filter(|p| !p.is_empty()) else {
        return Err(AppError::Unauthorized("Password required".to_string()));
    };

    if !verify_password(Some(password), share.password_hash.as_deref()) {
        tracing::debug!("Wrong password for share {}", share.share_id);
        return Err(AppError::Unauthorized("Invalid password".to_string()));
    }

    Ok(())
}

/// Gates 1 and 2; enough to show what a share contains.
pub async fn open_share(store: &DbStore, share_id: &str) -> AppResult<Share> {
    let share = resolve_share(store, share_id).await?;
    ensure_not_expired(&share)?;
    Ok(share)
}

/// All gates, in order; required before any bytes are served.
pub async fn unlock_share(
    store: &DbStore,
    share_id: &str,
    password: Option<&str>,
) -> AppResult<Share> {
    let share = open_share(store, share_id).await?;
    ensure_password(&share, password)?;
    Ok(share)
}

/// Password check behind the verify endpoint. An unprotected share always
/// passes. Expiration is not checked here.
pub async fn check_password(
    store: &DbStore,
    share_id: &str,
    password: Option<&str>,
) -> AppResult<()> {
    let share = resolve_share(store, share_id).await?;
    if !share.requires_password() {
        return Ok(());
    }

    if verify_password(password, share.password_hash.as_deref()) {
        Ok(())
    } else {
        Err(AppError::Unauthorized("Invalid password".to_string()))
    }
}

pub fn find_file(files: Vec<SharedFile>, file_id: i64) -> AppResult<SharedFile> {
    files
        .into_iter()
        .find(|f| f.id == file_id)
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))
}
