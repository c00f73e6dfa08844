use thiserror::Error;
use tokio::sync::mpsc;

use super::message::AuthMessage;

/// Tab-session scratch key: page to return to after a redirect fallback.
pub const RETURN_URL_KEY: &str = "identikit_oauth_return_url";
/// Tab-session scratch key: poll id to resume with after a redirect fallback.
pub const POLL_ID_KEY: &str = "identikit_oauth_poll_id";
/// Tab-session scratch key: anti-forgery correlation value.
pub const STATE_KEY: &str = "identikit_oauth_state";

/// The environment refused to open a detached window.
#[derive(Debug, Error)]
#[error("popup blocked: {0}")]
pub struct PopupBlocked(pub String);

/// Owned reference to a detached window. Exclusively held by one
/// orchestration attempt; nothing else may mutate it.
pub trait PopupHandle: Send {
    fn is_closed(&self) -> bool;
    fn close(&self);
}

/// Capability adapter over the host windowing environment.
///
/// The orchestration logic only depends on open / is-closed / close /
/// redirect, so a test double can stand in for a real windowing system.
pub trait BrowserHost: Send + Sync {
    /// Open a detached window at `url`. Errors when the environment blocks
    /// the popup; the orchestrator then falls back to a full-page redirect.
    fn open_popup(&self, url: &str, window_name: &str)
        -> Result<Box<dyn PopupHandle>, PopupBlocked>;

    /// Navigate the current page away (full-page redirect fallback).
    fn redirect(&self, url: &str);

    /// Current page location, persisted before a redirect so the host can
    /// return here afterwards.
    fn current_location(&self) -> String;

    /// Best-effort delivery of a completion envelope to the opener window,
    /// when running inside a popup. Returns `false` when there is no opener.
    fn post_to_opener(&self, _message: &AuthMessage) -> bool {
        false
    }
}

/// Generic inbound cross-window message subscription.
///
/// Payloads are sender-supplied JSON; the orchestrator validates shape and
/// timestamp freshness before acting. Dropping the receiver unsubscribes.
pub trait MessageSource: Send + Sync {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<serde_json::Value>;
}
