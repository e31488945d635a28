use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::utils::error::{AppError, AppResult};

/// Hashes a share password with a fresh salt. An absent or empty password
/// yields `None`, which means the share is not protected.
pub fn hash_password(password: Option<&str>) -> AppResult<Option<String>> {
    let Some(password) = password.filter(|p| !p.is_empty()) else {
        return Ok(None);
    };

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| Some(hash.to_string()))
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Checks a supplied password against a stored hash. Missing input on either
/// side never verifies.
pub fn verify_password(password: Option<&str>, password_hash: Option<&str>) -> bool {
    let (Some(password), Some(password_hash)) = (password, password_hash) else {
        return false;
    };
    if password.is_empty() || password_hash.is_empty() {
        return false;
    }

    let parsed_hash = match PasswordHash::new(password_hash) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::warn!("Failed to parse password hash: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
