use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

/// Callback invoked with `(is_authenticated, token)` on every session change.
pub type AuthStateListener = Arc<dyn Fn(bool, Option<&str>) + Send + Sync>;

/// Opaque handle returned by `subscribe`; pass back to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Fan-out registry for session-state transitions.
///
/// Listeners run synchronously in registration order. A panicking listener is
/// isolated and logged; the remaining listeners still receive the event. An
/// optional runtime hook (the host application's own notification channel)
/// fires after the listeners on every notification.
pub struct AuthStateBroadcaster {
    inner: Mutex<Inner>,
    runtime_hook: Option<AuthStateListener>,
}

struct Inner {
    next_id: u64,
    listeners: Vec<(ListenerId, AuthStateListener)>,
}

impl Default for AuthStateBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthStateBroadcaster {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 0,
                listeners: Vec::new(),
            }),
            runtime_hook: None,
        }
    }

    pub fn with_runtime_hook(
        mut self,
        hook: impl Fn(bool, Option<&str>) + Send + Sync + 'static,
    ) -> Self {
        self.runtime_hook = Some(Arc::new(hook));
        self
    }

    /// Register a listener and immediately deliver `current` to it, so late
    /// subscribers cannot miss a transition that already happened.
    pub fn subscribe(
        &self,
        listener: impl Fn(bool, Option<&str>) + Send + Sync + 'static,
        current: (bool, Option<&str>),
    ) -> ListenerId {
        let listener: AuthStateListener = Arc::new(listener);
        let id = {
            let mut inner = self.inner.lock().expect("listener registry poisoned");
            let id = ListenerId(inner.next_id);
            inner.next_id += 1;
            inner.listeners.push((id, listener.clone()));
            id
        };
        deliver(&listener, current.0, current.1);
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        let mut inner = self.inner.lock().expect("listener registry poisoned");
        inner.listeners.retain(|(lid, _)| *lid != id);
    }

    /// Deliver a transition to every listener, then the runtime hook.
    pub fn notify(&self, is_authenticated: bool, token: Option<&str>) {
        let listeners: Vec<AuthStateListener> = {
            let inner = self.inner.lock().expect("listener registry poisoned");
            inner.listeners.iter().map(|(_, l)| l.clone()).collect()
        };
        for listener in &listeners {
            deliver(listener, is_authenticated, token);
        }
        if let Some(hook) = &self.runtime_hook {
            deliver(hook, is_authenticated, token);
        }
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.inner
            .lock()
            .expect("listener registry poisoned")
            .listeners
            .len()
    }
}

fn deliver(listener: &AuthStateListener, is_authenticated: bool, token: Option<&str>) {
    let result = catch_unwind(AssertUnwindSafe(|| listener(is_authenticated, token)));
    if result.is_err() {
        tracing::warn!(is_authenticated, "auth state listener panicked");
    }
}
