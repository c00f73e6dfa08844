//! Authentication orchestration and token lifecycle.

pub mod api;
pub mod broadcast;
pub mod host;
pub mod message;
pub mod orchestrator;
pub mod service;
pub mod storage;
pub mod store;
pub mod token;

pub use api::{
    AuthApi, AuthPayload, AuthResult, AuthorizationRequest, OAuthProvider, PollState,
    PollStatusResponse, StatusPoller, UserInfo, UserSummary,
};
pub use broadcast::{AuthStateBroadcaster, ListenerId};
pub use host::{BrowserHost, MessageSource, PopupBlocked, PopupHandle};
pub use message::AuthMessage;
pub use orchestrator::{OrchestratorConfig, PopupOrchestrator};
pub use service::{AuthService, RedirectState};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use store::SessionStore;
pub use token::SessionToken;
