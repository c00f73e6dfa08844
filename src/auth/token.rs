use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Maximum age a persisted token is trusted without re-authentication.
pub const MAX_TOKEN_AGE_DAYS: i64 = 30;

/// Opaque session credential plus the moment it was persisted.
///
/// A token older than [`MAX_TOKEN_AGE_DAYS`] is treated as absent everywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    pub value: String,
    pub persisted_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            persisted_at: Utc::now(),
        }
    }

    pub fn with_persisted_at(value: impl Into<String>, persisted_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            persisted_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.persisted_at > Duration::days(MAX_TOKEN_AGE_DAYS)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_expired() {
        let token = SessionToken::new("abc");
        assert!(!token.is_expired());
    }

    #[test]
    fn token_expires_after_max_age() {
        let persisted = Utc::now() - Duration::days(MAX_TOKEN_AGE_DAYS) - Duration::seconds(1);
        let token = SessionToken::with_persisted_at("abc", persisted);
        assert!(token.is_expired());
    }

    #[test]
    fn token_at_exact_boundary_is_still_valid() {
        let now = Utc::now();
        let token = SessionToken::with_persisted_at("abc", now - Duration::days(MAX_TOKEN_AGE_DAYS));
        assert!(!token.is_expired_at(now));
    }
}
