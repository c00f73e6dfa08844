use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AuthErrorKind, Result};
use crate::http::ApiClient;

/// Third-party providers reached through the popup flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum OAuthProvider {
    Itchio,
    Google,
}

impl OAuthProvider {
    /// Name given to the detached popup window.
    pub fn window_name(&self) -> &'static str {
        match self {
            Self::Itchio => "itch_login",
            Self::Google => "google_login",
        }
    }
}

/// Identity attached to a successful authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub platform: String,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
}

/// Server payload for a completed authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPayload {
    #[serde(default)]
    pub user: UserSummary,
    #[serde(rename = "sessionId", default)]
    pub session_id: String,
    #[serde(rename = "tokenType", default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub message: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Default for AuthPayload {
    fn default() -> Self {
        Self {
            user: UserSummary::default(),
            session_id: String::new(),
            token_type: default_token_type(),
            message: String::new(),
        }
    }
}

/// Outcome of one authentication attempt. Always returned by value, never
/// raised; `succeeded == true` implies a non-empty `session_token`.
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub succeeded: bool,
    pub error: Option<AuthErrorKind>,
    pub user: UserSummary,
    pub session_token: Option<String>,
    pub message: String,
}

impl AuthResult {
    pub fn success(
        user: UserSummary,
        session_token: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            succeeded: true,
            error: None,
            user,
            session_token: Some(session_token.into()),
            message: message.into(),
        }
    }

    pub fn failure(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            error: Some(kind),
            user: UserSummary::default(),
            session_token: None,
            message: message.into(),
        }
    }
}

/// Result of URL acquisition; discarded once the popup/poll cycle resolves.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub auth_url: String,
    pub poll_id: Option<String>,
    pub state: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUrlResponse {
    #[serde(rename = "authUrl")]
    pub auth_url: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(rename = "expiresAt", default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollIdResponse {
    #[serde(rename = "pollId")]
    pub poll_id: String,
}

/// Lifecycle of a polled popup flow as reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollState {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollStatusResponse {
    pub status: PollState,
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user: Option<UserSummary>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionCheck {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub user: Option<UserSummary>,
}

/// Character-existence summary carried by `/auth/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct CharacterSummary {
    pub id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub last_edited_at: Option<String>,
    #[serde(default)]
    pub is_edited: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub user: UserSummary,
    #[serde(default)]
    pub character: Option<CharacterSummary>,
    #[serde(rename = "hasCharacter", default)]
    pub has_character: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogoutResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Pull-style status source for a popup flow. Implemented by [`AuthApi`];
/// swappable in tests.
#[async_trait]
pub trait StatusPoller: Send + Sync {
    async fn poll(&self, poll_id: &str) -> Result<PollStatusResponse>;
}

/// Typed wrappers over the `/auth` endpoints.
pub struct AuthApi {
    client: Arc<ApiClient>,
}

impl AuthApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    /// Obtain a correlation id for polling-style flows.
    pub async fn poll_id(&self) -> Result<String> {
        let response: PollIdResponse = self.client.get("/auth/oauth/poll-id").await?;
        Ok(response.poll_id)
    }

    /// Obtain a provider authorization URL, optionally bound to a poll id.
    pub async fn authorization_url(
        &self,
        provider: OAuthProvider,
        poll_id: Option<&str>,
    ) -> Result<AuthorizationRequest> {
        let path = match poll_id {
            Some(id) => format!("/auth/{provider}/authorization-url?poll_id={id}"),
            None => format!("/auth/{provider}/authorization-url"),
        };
        let response: AuthUrlResponse = self.client.get(&path).await?;
        Ok(AuthorizationRequest {
            auth_url: response.auth_url,
            poll_id: poll_id.map(str::to_string),
            state: response.state,
            expires_at: response.expires_at,
        })
    }

    /// Exchange a first-party Newgrounds session id for a service token.
    pub async fn authenticate_newgrounds(&self, session_id: &str) -> Result<AuthPayload> {
        self.client
            .post(
                "/auth/newgrounds/authenticate",
                &json!({ "session_id": session_id }),
            )
            .await
    }

    pub async fn verify_session(&self) -> Result<SessionCheck> {
        self.client.get("/auth/session").await
    }

    pub async fn current_user(&self) -> Result<UserInfo> {
        self.client.get("/auth/me").await
    }

    pub async fn logout(&self) -> Result<LogoutResponse> {
        self.client.delete("/auth/session").await
    }
}

#[async_trait]
impl StatusPoller for AuthApi {
    async fn poll(&self, poll_id: &str) -> Result<PollStatusResponse> {
        self.client.get(&format!("/auth/oauth/poll/{poll_id}")).await
    }
}
