use std::sync::Arc;

use tokio::time::sleep;

use crate::error::{ApiError, AuthErrorKind, Result};
use crate::util::RetryPolicy;

use super::api::{
    AuthApi, AuthResult, AuthorizationRequest, LogoutResponse, OAuthProvider, SessionCheck,
    StatusPoller, UserInfo,
};
use super::host::{BrowserHost, MessageSource, POLL_ID_KEY, RETURN_URL_KEY, STATE_KEY};
use super::message::AuthMessage;
use super::orchestrator::{OrchestratorConfig, PopupOrchestrator};
use super::storage::KeyValueStorage;
use super::store::SessionStore;

/// State recovered from tab-session scratch storage after a redirect
/// fallback round trip.
#[derive(Debug, Clone)]
pub struct RedirectState {
    pub return_url: Option<String>,
    pub poll_id: Option<String>,
    pub state: Option<String>,
}

/// Facade composing URL acquisition, popup orchestration, and the session
/// store into per-provider login operations.
///
/// Login operations never return `Err`; every outcome is an [`AuthResult`].
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use identikit::auth::{AuthApi, AuthService, SessionStore};
/// use identikit::auth::storage::MemoryStorage;
/// use identikit::config::ApiConfig;
/// use identikit::http::ApiClient;
/// # use identikit::auth::host::{BrowserHost, MessageSource};
/// # fn wire(host: Arc<dyn BrowserHost>, messages: Arc<dyn MessageSource>) {
/// let session = Arc::new(SessionStore::default());
/// let client = Arc::new(ApiClient::new(ApiConfig::default(), session.clone()));
/// let api = Arc::new(AuthApi::new(client));
/// let scratch = Arc::new(MemoryStorage::new());
/// let service = AuthService::new(api, session, host, messages, scratch);
/// # }
/// ```
pub struct AuthService {
    api: Arc<AuthApi>,
    session: Arc<SessionStore>,
    host: Arc<dyn BrowserHost>,
    scratch: Arc<dyn KeyValueStorage>,
    orchestrator: PopupOrchestrator,
    retry: RetryPolicy,
}

impl AuthService {
    pub fn new(
        api: Arc<AuthApi>,
        session: Arc<SessionStore>,
        host: Arc<dyn BrowserHost>,
        messages: Arc<dyn MessageSource>,
        scratch: Arc<dyn KeyValueStorage>,
    ) -> Self {
        let poller: Arc<dyn StatusPoller> = api.clone();
        let orchestrator = PopupOrchestrator::new(
            host.clone(),
            messages,
            poller,
            scratch.clone(),
            session.clone(),
        );
        Self {
            api,
            session,
            host,
            scratch,
            orchestrator,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_orchestrator_config(mut self, config: OrchestratorConfig) -> Self {
        self.orchestrator = self.orchestrator.with_config(config);
        self
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Local check only; use [`AuthService::verify_session`] for server-side
    /// validation.
    pub fn is_logged_in(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Complete OAuth flow for itch.io, popups and all.
    pub async fn login_with_itch(&self) -> AuthResult {
        self.login(OAuthProvider::Itchio).await
    }

    /// Complete OAuth flow for Google, popups and all.
    pub async fn login_with_google(&self) -> AuthResult {
        self.login(OAuthProvider::Google).await
    }

    async fn login(&self, provider: OAuthProvider) -> AuthResult {
        let request = match self.acquire_authorization(provider).await {
            Ok(request) => request,
            Err(result) => return result,
        };
        self.orchestrator.run(&request, provider.window_name()).await
    }

    /// Acquire a poll id and authorization URL with bounded retry.
    ///
    /// Application-level rejections are re-attempted with a linearly growing
    /// delay, transport failures with exponential backoff; exhaustion yields
    /// a failure result rather than an error.
    async fn acquire_authorization(
        &self,
        provider: OAuthProvider,
    ) -> std::result::Result<AuthorizationRequest, AuthResult> {
        let mut last_error: Option<ApiError> = None;
        for attempt in 1..=self.retry.max_attempts {
            let outcome = async {
                let poll_id = self.api.poll_id().await?;
                self.api.authorization_url(provider, Some(&poll_id)).await
            }
            .await;
            match outcome {
                Ok(request) => return Ok(request),
                Err(err) => {
                    if attempt >= self.retry.max_attempts {
                        last_error = Some(err);
                        break;
                    }
                    let delay = if err.is_transport() {
                        self.retry.backoff_delay(attempt)
                    } else {
                        self.retry.linear_delay(attempt)
                    };
                    tracing::warn!(
                        provider = %provider,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %err,
                        "authorization URL request failed, retrying"
                    );
                    last_error = Some(err);
                    sleep(delay).await;
                }
            }
        }
        let (kind, detail) = match &last_error {
            Some(err) => (err.kind(), err.to_string()),
            None => (AuthErrorKind::UnknownError, "no attempts made".to_string()),
        };
        Err(AuthResult::failure(
            kind,
            format!("Failed to get authorization URL after multiple attempts: {detail}"),
        ))
    }

    /// Exchange a first-party Newgrounds session id for a service token.
    ///
    /// Call after the player is assigned a session by the Newgrounds runtime.
    /// When running inside a popup, the completion envelope is also posted
    /// back to the opener window, best-effort.
    pub async fn authenticate_newgrounds(&self, session_id: &str) -> AuthResult {
        if session_id.trim().is_empty() {
            return AuthResult::failure(
                AuthErrorKind::ValidationError,
                "A Newgrounds session id is required",
            );
        }
        match self.api.authenticate_newgrounds(session_id).await {
            Ok(payload) => {
                if payload.session_id.is_empty() {
                    return AuthResult::failure(
                        AuthErrorKind::UnknownError,
                        "Server response was missing a session token",
                    );
                }
                self.session.set_token(&payload.session_id);
                if self.host.post_to_opener(&AuthMessage::completed(payload.clone())) {
                    tracing::debug!("posted completion envelope to opener window");
                }
                AuthResult::success(payload.user, payload.session_id, payload.message)
            }
            Err(err) => AuthResult::failure(err.kind(), err.to_string()),
        }
    }

    /// Verify the current session against the server; an invalid session
    /// clears the local token.
    pub async fn verify_session(&self) -> Result<SessionCheck> {
        let check = self.api.verify_session().await?;
        if !check.valid {
            self.session.clear_token();
        }
        Ok(check)
    }

    /// Fetch the current user plus character-existence summary.
    pub async fn current_user(&self) -> Result<UserInfo> {
        self.api.current_user().await
    }

    /// Invalidate the server-side session. The local token is cleared
    /// whether or not the server call succeeds.
    pub async fn logout(&self) -> Result<LogoutResponse> {
        let result = self.api.logout().await;
        self.session.clear_token();
        result
    }

    /// Recover redirect-fallback state persisted before a full-page
    /// navigation. `None` when no redirect is pending. Call this from the
    /// host's startup routine.
    pub fn pending_redirect(&self) -> Option<RedirectState> {
        let return_url = self.scratch.get(RETURN_URL_KEY).ok().flatten();
        let poll_id = self.scratch.get(POLL_ID_KEY).ok().flatten();
        if return_url.is_none() && poll_id.is_none() {
            return None;
        }
        Some(RedirectState {
            return_url,
            poll_id,
            state: self.scratch.get(STATE_KEY).ok().flatten(),
        })
    }

    /// Complete a login attempt that fell back to a full-page redirect,
    /// polling with the recovered correlation id. Clears the scratch state.
    pub async fn resume_redirect_login(&self) -> AuthResult {
        let Some(pending) = self.pending_redirect() else {
            return AuthResult::failure(
                AuthErrorKind::ValidationError,
                "No redirect login to resume",
            );
        };
        self.clear_redirect_state();
        match pending.poll_id {
            Some(poll_id) => self.orchestrator.run_poll_only(&poll_id).await,
            None => AuthResult::failure(
                AuthErrorKind::ValidationError,
                "Stored redirect state had no poll id",
            ),
        }
    }

    fn clear_redirect_state(&self) {
        for key in [RETURN_URL_KEY, POLL_ID_KEY, STATE_KEY] {
            if let Err(err) = self.scratch.remove(key) {
                tracing::warn!(error = %err, key, "could not clear redirect state entry");
            }
        }
    }
}
