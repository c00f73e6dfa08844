use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, sleep, Instant};
use uuid::Uuid;

use crate::error::AuthErrorKind;

use super::api::{AuthResult, AuthorizationRequest, PollState, PollStatusResponse, StatusPoller};
use super::host::{BrowserHost, MessageSource, PopupHandle, POLL_ID_KEY, RETURN_URL_KEY, STATE_KEY};
use super::message::AuthMessage;
use super::storage::KeyValueStorage;
use super::store::SessionStore;

/// Timing knobs for one popup attempt.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Hard deadline for the whole attempt.
    pub timeout: Duration,
    /// Spacing between status-poll requests.
    pub poll_interval: Duration,
    /// Spacing between closed-window checks.
    pub watchdog_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5 * 60),
            poll_interval: Duration::from_secs(2),
            watchdog_interval: Duration::from_secs(1),
        }
    }
}

/// Drives one popup-based OAuth attempt to exactly one result.
///
/// Four completion sources race: an inbound cross-window message, the status
/// poll (when a poll id is present), a closed-window watchdog, and a hard
/// timeout. The `select!` loop owns every source, so the first arm to resolve
/// returns and drops the rest; there is no path to a second resolution, and
/// cleanup (timers, message subscription, popup) runs on every exit.
///
/// When the popup cannot be opened at all, the attempt persists its return
/// URL and poll id to the tab-session scratch storage and falls back to a
/// full-page redirect; the host's startup routine recovers the stored state
/// after the round trip.
pub struct PopupOrchestrator {
    host: Arc<dyn BrowserHost>,
    messages: Arc<dyn MessageSource>,
    poller: Arc<dyn StatusPoller>,
    scratch: Arc<dyn KeyValueStorage>,
    session: Arc<SessionStore>,
    config: OrchestratorConfig,
}

impl PopupOrchestrator {
    pub fn new(
        host: Arc<dyn BrowserHost>,
        messages: Arc<dyn MessageSource>,
        poller: Arc<dyn StatusPoller>,
        scratch: Arc<dyn KeyValueStorage>,
        session: Arc<SessionStore>,
    ) -> Self {
        Self {
            host,
            messages,
            poller,
            scratch,
            session,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Run one attempt for the given authorization request.
    pub async fn run(&self, request: &AuthorizationRequest, window_name: &str) -> AuthResult {
        let state = request
            .state
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        if let Err(err) = self.scratch.set(STATE_KEY, &state) {
            tracing::warn!(error = %err, "could not store correlation state");
            return AuthResult::failure(
                AuthErrorKind::StateSetupFailed,
                "Unable to set up secure authentication",
            );
        }

        let popup = match self.host.open_popup(&request.auth_url, window_name) {
            Ok(popup) if !popup.is_closed() => popup,
            Ok(_) | Err(_) => return self.redirect_fallback(request),
        };

        let result = self.await_result(request, popup.as_ref()).await;

        if !popup.is_closed() {
            popup.close();
        }
        if let Err(err) = self.scratch.remove(STATE_KEY) {
            tracing::warn!(error = %err, "could not clear correlation state");
        }
        result
    }

    /// Resume a flow after a redirect round trip: no popup, poll only.
    pub async fn run_poll_only(&self, poll_id: &str) -> AuthResult {
        let timeout = sleep(self.config.timeout);
        tokio::pin!(timeout);
        let mut poll_timer = interval_at(
            Instant::now() + self.config.poll_interval,
            self.config.poll_interval,
        );
        loop {
            tokio::select! {
                _ = &mut timeout => {
                    return AuthResult::failure(
                        AuthErrorKind::Timeout,
                        "Authentication timed out. Please try again.",
                    );
                }
                _ = poll_timer.tick() => {
                    match self.poller.poll(poll_id).await {
                        Err(err) => {
                            tracing::debug!(error = %err, "poll tick failed, retrying");
                        }
                        Ok(status) => {
                            if let Some(result) = self.handle_poll(status) {
                                return result;
                            }
                        }
                    }
                }
            }
        }
    }

    fn redirect_fallback(&self, request: &AuthorizationRequest) -> AuthResult {
        tracing::debug!("popup blocked, falling back to full-page redirect");
        if let Err(err) = self.scratch.set(RETURN_URL_KEY, &self.host.current_location()) {
            tracing::warn!(error = %err, "could not store return URL");
        }
        if let Some(poll_id) = &request.poll_id {
            if let Err(err) = self.scratch.set(POLL_ID_KEY, poll_id) {
                tracing::warn!(error = %err, "could not store poll id");
            }
        }
        self.host.redirect(&request.auth_url);
        AuthResult::failure(
            AuthErrorKind::PopupBlocked,
            "Popup was blocked; continuing via full-page redirect",
        )
    }

    async fn await_result(
        &self,
        request: &AuthorizationRequest,
        popup: &dyn PopupHandle,
    ) -> AuthResult {
        let mut inbound = self.messages.subscribe();
        let mut inbound_open = true;
        let timeout = sleep(self.config.timeout);
        tokio::pin!(timeout);
        let mut watchdog = interval_at(
            Instant::now() + self.config.watchdog_interval,
            self.config.watchdog_interval,
        );
        let mut poll_timer = interval_at(
            Instant::now() + self.config.poll_interval,
            self.config.poll_interval,
        );

        loop {
            tokio::select! {
                _ = &mut timeout => {
                    tracing::warn!("popup attempt timed out");
                    return AuthResult::failure(
                        AuthErrorKind::Timeout,
                        "Authentication timed out. Please try again.",
                    );
                }
                message = inbound.recv(), if inbound_open => {
                    match message {
                        None => inbound_open = false,
                        Some(value) => {
                            if let Some(result) = self.handle_message(&value) {
                                return result;
                            }
                        }
                    }
                }
                _ = poll_timer.tick(), if request.poll_id.is_some() => {
                    let Some(poll_id) = request.poll_id.as_deref() else {
                        continue;
                    };
                    match self.poller.poll(poll_id).await {
                        Err(err) => {
                            // Transport hiccups must not terminate the attempt.
                            tracing::debug!(error = %err, "poll tick failed, retrying");
                        }
                        Ok(status) => {
                            if let Some(result) = self.handle_poll(status) {
                                return result;
                            }
                        }
                    }
                }
                _ = watchdog.tick() => {
                    if popup.is_closed() {
                        tracing::debug!("popup closed by user");
                        return AuthResult::failure(
                            AuthErrorKind::PopupClosed,
                            "Login window was closed before completing authentication.",
                        );
                    }
                }
            }
        }
    }

    /// Validate an inbound envelope. `None` keeps the attempt running.
    fn handle_message(&self, value: &serde_json::Value) -> Option<AuthResult> {
        let message = AuthMessage::parse(value)?;
        if !message.is_fresh() {
            tracing::warn!("ignoring stale auth message");
            return None;
        }
        if message.success {
            let data = message.data.unwrap_or_default();
            if data.session_id.is_empty() {
                return Some(AuthResult::failure(
                    AuthErrorKind::UnknownError,
                    "Completion message was missing a session token",
                ));
            }
            self.session.set_token(&data.session_id);
            return Some(AuthResult::success(data.user, data.session_id, data.message));
        }
        let kind = message
            .error
            .as_deref()
            .map(AuthErrorKind::from_label)
            .unwrap_or(AuthErrorKind::UnknownError);
        Some(AuthResult::failure(
            kind,
            message.message.unwrap_or_else(|| "Authentication failed".to_string()),
        ))
    }

    /// Map a poll response. `None` keeps the loop ticking.
    fn handle_poll(&self, status: PollStatusResponse) -> Option<AuthResult> {
        match status.status {
            PollState::Pending => None,
            PollState::Failed => {
                let kind = status
                    .error
                    .as_deref()
                    .map(AuthErrorKind::from_label)
                    .unwrap_or(AuthErrorKind::PollingFailed);
                Some(AuthResult::failure(
                    kind,
                    status
                        .message
                        .unwrap_or_else(|| "Authentication failed".to_string()),
                ))
            }
            PollState::Completed => {
                let session_id = status.session_id.unwrap_or_default();
                if status.success && !session_id.is_empty() {
                    self.session.set_token(&session_id);
                    Some(AuthResult::success(
                        status.user.unwrap_or_default(),
                        session_id,
                        status.message.unwrap_or_else(|| "Login successful".to_string()),
                    ))
                } else {
                    let kind = status
                        .error
                        .as_deref()
                        .map(AuthErrorKind::from_label)
                        .unwrap_or(AuthErrorKind::PollingFailed);
                    Some(AuthResult::failure(
                        kind,
                        status
                            .message
                            .unwrap_or_else(|| "Authentication failed".to_string()),
                    ))
                }
            }
        }
    }
}
