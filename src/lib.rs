//! Rust client SDK for the Identikit service.
//!
//! Establishes and maintains an authenticated session against the remote
//! identity service: popup-based OAuth for third-party providers (itch.io,
//! Google), a direct session-token exchange for Newgrounds, and the token
//! persistence/broadcast layer that makes the session visible to the rest of
//! the application.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use identikit::prelude::*;
//! use identikit::auth::AuthApi;
//! use identikit::http::ApiClient;
//! # use identikit::auth::host::{BrowserHost, MessageSource};
//! # use identikit::auth::storage::MemoryStorage;
//!
//! # async fn example(host: Arc<dyn BrowserHost>, messages: Arc<dyn MessageSource>) {
//! let session = Arc::new(SessionStore::default());
//! let client = Arc::new(ApiClient::new(ApiConfig::default(), session.clone()));
//! let api = Arc::new(AuthApi::new(client));
//! let scratch = Arc::new(MemoryStorage::new());
//! let auth = AuthService::new(api, session, host, messages, scratch);
//!
//! let result = auth.login_with_itch().await;
//! if result.succeeded {
//!     println!("logged in as {}", result.user.username);
//! }
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod prelude;
pub mod util;
