#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use identikit::auth::storage::{KeyValueStorage, StorageError};
use identikit::auth::{
    AuthMessage, BrowserHost, MessageSource, PollStatusResponse, PopupBlocked, PopupHandle,
    StatusPoller,
};
use identikit::error::ApiError;
use tokio::sync::mpsc;

/// Shared closed-flag for a scripted popup; lets a test "close" the window.
#[derive(Clone, Default)]
pub struct PopupFlag(Arc<AtomicBool>);

impl PopupFlag {
    pub fn close(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct ScriptedPopup {
    flag: PopupFlag,
}

impl PopupHandle for ScriptedPopup {
    fn is_closed(&self) -> bool {
        self.flag.is_closed()
    }

    fn close(&self) {
        self.flag.close();
    }
}

/// Scripted windowing environment: opens popups unless told to block, and
/// records every redirect and opener post.
pub struct ScriptedHost {
    blocked: AtomicBool,
    location: String,
    popup_flag: PopupFlag,
    pub redirects: Mutex<Vec<String>>,
    pub opener_posts: Mutex<Vec<AuthMessage>>,
}

impl ScriptedHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            blocked: AtomicBool::new(false),
            location: "https://game.example.test/play".to_string(),
            popup_flag: PopupFlag::default(),
            redirects: Mutex::new(Vec::new()),
            opener_posts: Mutex::new(Vec::new()),
        })
    }

    pub fn blocked() -> Arc<Self> {
        let host = Self::new();
        host.blocked.store(true, Ordering::SeqCst);
        host
    }

    /// Flag controlling the popup this host hands out.
    pub fn popup(&self) -> PopupFlag {
        self.popup_flag.clone()
    }

    pub fn redirected_to(&self) -> Option<String> {
        self.redirects.lock().unwrap().first().cloned()
    }
}

impl BrowserHost for ScriptedHost {
    fn open_popup(
        &self,
        _url: &str,
        _window_name: &str,
    ) -> Result<Box<dyn PopupHandle>, PopupBlocked> {
        if self.blocked.load(Ordering::SeqCst) {
            return Err(PopupBlocked("scripted block".to_string()));
        }
        Ok(Box::new(ScriptedPopup {
            flag: self.popup_flag.clone(),
        }))
    }

    fn redirect(&self, url: &str) {
        self.redirects.lock().unwrap().push(url.to_string());
    }

    fn current_location(&self) -> String {
        self.location.clone()
    }

    fn post_to_opener(&self, message: &AuthMessage) -> bool {
        self.opener_posts.lock().unwrap().push(message.clone());
        true
    }
}

/// Fan-in message source; `emit` delivers a payload to every subscriber.
#[derive(Default)]
pub struct ScriptedMessages {
    senders: Mutex<Vec<mpsc::UnboundedSender<serde_json::Value>>>,
}

impl ScriptedMessages {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn emit(&self, value: serde_json::Value) {
        for sender in self.senders.lock().unwrap().iter() {
            let _ = sender.send(value.clone());
        }
    }
}

impl MessageSource for ScriptedMessages {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<serde_json::Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().unwrap().push(tx);
        rx
    }
}

/// Scripted status poller: pops responses in order, then reports pending.
#[derive(Default)]
pub struct ScriptedPoller {
    responses: Mutex<VecDeque<Result<PollStatusResponse, ApiError>>>,
    pub polls: Mutex<Vec<String>>,
}

impl ScriptedPoller {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, response: Result<PollStatusResponse, ApiError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn poll_count(&self) -> usize {
        self.polls.lock().unwrap().len()
    }
}

#[async_trait]
impl StatusPoller for ScriptedPoller {
    async fn poll(&self, poll_id: &str) -> Result<PollStatusResponse, ApiError> {
        self.polls.lock().unwrap().push(poll_id.to_string());
        match self.responses.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok(pending()),
        }
    }
}

/// Storage that fails every write; reads see nothing.
pub struct BrokenStorage;

impl KeyValueStorage for BrokenStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Io("storage unavailable".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Io("storage unavailable".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Io("storage unavailable".to_string()))
    }
}

pub fn pending() -> PollStatusResponse {
    serde_json::from_str(r#"{"status":"pending"}"#).unwrap()
}

pub fn completed(session_id: &str) -> PollStatusResponse {
    serde_json::from_str(&format!(
        r#"{{
            "status": "completed",
            "success": true,
            "sessionId": "{session_id}",
            "user": {{"id": "u1", "username": "kit", "platform": "itch", "isAdmin": false}},
            "message": "Login successful"
        }}"#
    ))
    .unwrap()
}

pub fn poll_failed(error: &str, message: &str) -> PollStatusResponse {
    serde_json::from_str(&format!(
        r#"{{"status": "failed", "error": "{error}", "message": "{message}"}}"#
    ))
    .unwrap()
}
