//! Convenience re-exports for common use.

pub use crate::auth::{
    AuthResult, AuthService, OAuthProvider, SessionStore, UserInfo, UserSummary,
};
pub use crate::config::ApiConfig;
pub use crate::error::{ApiError, AuthErrorKind, Result};
