//! Error types for the Identikit client.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::storage::StorageError;

/// Machine-readable failure label carried in auth results and server envelopes.
///
/// These are the conditions a caller can branch on; the accompanying message is
/// human-readable and not stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    ValidationError,
    AuthenticationRequired,
    NetworkError,
    RequestTimeout,
    PopupBlocked,
    PopupClosed,
    Timeout,
    PollingFailed,
    StateSetupFailed,
    UnknownError,
}

impl AuthErrorKind {
    /// Map a server-supplied error label to a kind, defaulting to `UnknownError`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "validation_error" => Self::ValidationError,
            "authentication_required" => Self::AuthenticationRequired,
            "network_error" => Self::NetworkError,
            "request_timeout" => Self::RequestTimeout,
            "popup_blocked" => Self::PopupBlocked,
            "popup_closed" => Self::PopupClosed,
            "timeout" => Self::Timeout,
            "polling_failed" => Self::PollingFailed,
            "state_setup_failed" => Self::StateSetupFailed,
            _ => Self::UnknownError,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "validation_error",
            Self::AuthenticationRequired => "authentication_required",
            Self::NetworkError => "network_error",
            Self::RequestTimeout => "request_timeout",
            Self::PopupBlocked => "popup_blocked",
            Self::PopupClosed => "popup_closed",
            Self::Timeout => "timeout",
            Self::PollingFailed => "polling_failed",
            Self::StateSetupFailed => "state_setup_failed",
            Self::UnknownError => "unknown_error",
        }
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary error type for API operations.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        /// Server-supplied error label, when the body carried one.
        error: Option<String>,
        message: String,
    },

    /// The server returned 401; the session token has already been cleared.
    #[error("Authentication required: {0}")]
    Unauthorized(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// Classify into the label a caller branches on.
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            Self::Api {
                error: Some(label), ..
            } => AuthErrorKind::from_label(label),
            Self::Api { .. } => AuthErrorKind::UnknownError,
            Self::Unauthorized(_) => AuthErrorKind::AuthenticationRequired,
            Self::Network(_) => AuthErrorKind::NetworkError,
            Self::Timeout(_) => AuthErrorKind::RequestTimeout,
            Self::Serialization(_) | Self::Storage(_) => AuthErrorKind::UnknownError,
        }
    }

    /// Transport-level failure (as opposed to an application-level rejection).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }

    /// Whether this error is worth retrying at all.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(0)
        } else {
            Self::Network(error.to_string())
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ApiError>;
