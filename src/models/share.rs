use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Share {
    pub id: i64,
    pub share_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub password_hash: Option<String>,
    pub brand_name: Option<String>,
    pub language: String,
    pub is_active: bool,
}

impl Share {
    /// Expiration is authoritative on its own; the sweep may not have caught
    /// up with `is_active` yet.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires < now)
    }

    pub fn requires_password(&self) -> bool {
        self.password_hash.as_deref().is_some_and(|h| !h.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct NewShare {
    pub share_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub password_hash: Option<String>,
    pub brand_name: Option<String>,
    pub language: String,
}

impl NewShare {
    pub fn new(
        share_id: String,
        expires_at: Option<DateTime<Utc>>,
        password_hash: Option<String>,
        brand_name: Option<String>,
        language: String,
    ) -> Self {
        Self {
            share_id,
            created_at: Utc::now(),
            expires_at,
            password_hash,
            brand_name,
            language,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn share(expires_at: Option<DateTime<Utc>>, password_hash: Option<&str>) -> Share {
        Share {
            id: 1,
            share_id: "abcdefghijkl".to_string(),
            created_at: Utc::now(),
            expires_at,
            password_hash: password_hash.map(str::to_string),
            brand_name: None,
            language: "en".to_string(),
            is_active: true,
        }
    }

    #[test]
    fn expiry_ignores_active_flag() {
        let now = Utc::now();
        assert!(share(Some(now - Duration::seconds(1)), None).is_expired_at(now));
        assert!(!share(Some(now + Duration::days(1)), None).is_expired_at(now));
        assert!(!share(None, None).is_expired_at(now));
    }

    #[test]
    fn empty_hash_is_not_a_password() {
        assert!(share(None, Some("$argon2id$...")).requires_password());
        assert!(!share(None, Some("")).requires_password());
        assert!(!share(None, None).requires_password());
    }
}
