use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::api::AuthPayload;

/// Messages older than this are ignored (anti-replay / stale-tab guard).
pub const MAX_MESSAGE_AGE_MS: i64 = 30_000;

/// Cross-window completion envelope.
///
/// `success` and `timestamp` are mandatory; an inbound payload missing either
/// does not parse and is ignored by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthMessage {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AuthPayload>,
    /// Sender clock, epoch milliseconds.
    pub timestamp: i64,
}

impl AuthMessage {
    /// Build a success envelope stamped with the current time.
    pub fn completed(data: AuthPayload) -> Self {
        Self {
            success: true,
            error: None,
            message: None,
            data: Some(data),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Build a failure envelope stamped with the current time.
    pub fn failed(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            message: Some(message.into()),
            data: None,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Parse an arbitrary inbound payload. `None` when the shape does not
    /// match the expected envelope.
    pub fn parse(value: &serde_json::Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn is_fresh_at(&self, now_ms: i64) -> bool {
        now_ms - self.timestamp <= MAX_MESSAGE_AGE_MS
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now().timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_accepts_well_formed_envelope() {
        let value = json!({
            "success": true,
            "data": { "sessionId": "tok-1" },
            "timestamp": Utc::now().timestamp_millis(),
        });
        let message = AuthMessage::parse(&value).expect("envelope");
        assert!(message.success);
        assert_eq!(message.data.unwrap().session_id, "tok-1");
    }

    #[test]
    fn parse_rejects_missing_timestamp() {
        assert!(AuthMessage::parse(&json!({ "success": true })).is_none());
    }

    #[test]
    fn parse_rejects_missing_success() {
        assert!(AuthMessage::parse(&json!({ "timestamp": 123 })).is_none());
    }

    #[test]
    fn parse_rejects_non_objects() {
        assert!(AuthMessage::parse(&json!("hello")).is_none());
        assert!(AuthMessage::parse(&json!(42)).is_none());
    }

    #[test]
    fn freshness_boundary_is_thirty_seconds() {
        let now = Utc::now().timestamp_millis();
        let message = AuthMessage {
            success: true,
            error: None,
            message: None,
            data: None,
            timestamp: now - MAX_MESSAGE_AGE_MS,
        };
        assert!(message.is_fresh_at(now));
        let stale = AuthMessage {
            timestamp: now - MAX_MESSAGE_AGE_MS - 1,
            ..message
        };
        assert!(!stale.is_fresh_at(now));
    }
}
