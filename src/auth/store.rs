use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use super::broadcast::{AuthStateBroadcaster, ListenerId};
use super::storage::{KeyValueStorage, MemoryStorage};
use super::token::SessionToken;

/// Durable-storage key for the token value.
pub const TOKEN_KEY: &str = "identikit_auth_token";
/// Durable-storage key for the persisted-at timestamp (epoch milliseconds).
pub const TOKEN_SAVED_AT_KEY: &str = "identikit_auth_token_saved_at";

/// Process-wide session token owner.
///
/// Holds the current token in memory, persists it best-effort to the injected
/// storage backend, and broadcasts every transition. Construct one instance
/// and share it by `Arc`; every other component reads the token only through
/// these accessors.
///
/// Storage failures never fail the calling operation; the store degrades to
/// memory-only, in-session state and logs the problem.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use identikit::auth::storage::MemoryStorage;
/// use identikit::auth::SessionStore;
///
/// let store = SessionStore::new(Arc::new(MemoryStorage::new()));
/// store.set_token("tok-123");
/// assert!(store.is_authenticated());
/// ```
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
    broadcaster: AuthStateBroadcaster,
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    token: Option<SessionToken>,
    initialized: bool,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage,
            broadcaster: AuthStateBroadcaster::new(),
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Install the host application's own notification channel. It fires after
    /// the registered listeners on every transition.
    pub fn with_runtime_hook(
        mut self,
        hook: impl Fn(bool, Option<&str>) + Send + Sync + 'static,
    ) -> Self {
        self.broadcaster = self.broadcaster.with_runtime_hook(hook);
        self
    }

    /// Restore any unexpired persisted token. Idempotent; called lazily by the
    /// accessors, so an explicit call is only needed to front-load the I/O.
    pub fn initialize(&self) {
        let mut state = self.state.lock().expect("session state poisoned");
        self.initialize_locked(&mut state);
    }

    fn initialize_locked(&self, state: &mut StoreState) {
        if state.initialized {
            return;
        }
        state.initialized = true;
        match self.read_persisted() {
            Ok(Some(token)) if !token.is_expired() => {
                tracing::debug!("restored persisted session token");
                state.token = Some(token);
            }
            Ok(Some(_)) => {
                tracing::debug!("persisted session token expired, purging");
                self.purge_persisted();
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "session storage unavailable, running memory-only");
            }
        }
    }

    fn read_persisted(&self) -> Result<Option<SessionToken>, super::storage::StorageError> {
        let Some(value) = self.storage.get(TOKEN_KEY)? else {
            return Ok(None);
        };
        let persisted_at = self
            .storage
            .get(TOKEN_SAVED_AT_KEY)?
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(millis_to_datetime);
        match persisted_at {
            Some(persisted_at) => Ok(Some(SessionToken::with_persisted_at(value, persisted_at))),
            // A token without a readable timestamp cannot be age-checked.
            None => {
                self.purge_persisted();
                Ok(None)
            }
        }
    }

    fn persist(&self, token: &SessionToken) {
        let millis = token.persisted_at.timestamp_millis().to_string();
        if let Err(err) = self
            .storage
            .set(TOKEN_KEY, &token.value)
            .and_then(|_| self.storage.set(TOKEN_SAVED_AT_KEY, &millis))
        {
            tracing::warn!(error = %err, "failed to persist session token");
        }
    }

    fn purge_persisted(&self) {
        for key in [TOKEN_KEY, TOKEN_SAVED_AT_KEY] {
            if let Err(err) = self.storage.remove(key) {
                tracing::warn!(error = %err, key, "failed to remove persisted entry");
            }
        }
    }

    /// Adopt a new token, persist it best-effort, and notify listeners.
    pub fn set_token(&self, value: impl Into<String>) {
        let token = SessionToken::new(value);
        {
            let mut state = self.state.lock().expect("session state poisoned");
            self.initialize_locked(&mut state);
            self.persist(&token);
            state.token = Some(token.clone());
        }
        self.broadcaster.notify(true, Some(&token.value));
    }

    /// Drop the current token, remove the persisted entry, and notify.
    pub fn clear_token(&self) {
        {
            let mut state = self.state.lock().expect("session state poisoned");
            self.initialize_locked(&mut state);
            state.token = None;
            self.purge_persisted();
        }
        self.broadcaster.notify(false, None);
    }

    pub fn get_token(&self) -> Option<String> {
        let mut state = self.state.lock().expect("session state poisoned");
        self.initialize_locked(&mut state);
        match &state.token {
            Some(token) if token.is_expired() => {
                state.token = None;
                self.purge_persisted();
                None
            }
            Some(token) => Some(token.value.clone()),
            None => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.get_token().is_some()
    }

    /// Register a listener. It receives the current state immediately, then
    /// every subsequent transition until unsubscribed.
    pub fn subscribe(
        &self,
        listener: impl Fn(bool, Option<&str>) + Send + Sync + 'static,
    ) -> ListenerId {
        let current = self.get_token();
        self.broadcaster
            .subscribe(listener, (current.is_some(), current.as_deref()))
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.broadcaster.unsubscribe(id);
    }
}

fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}
