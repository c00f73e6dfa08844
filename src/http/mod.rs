//! HTTP transport: bearer auth, JSON/text negotiation, 401 recovery.

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::auth::SessionStore;
use crate::config::ApiConfig;
use crate::error::{ApiError, Result};

/// Authenticated HTTP client for the Identikit service.
///
/// Every request carries the current session token as a bearer credential when
/// one is present. A 401 response clears the stored token before the error is
/// returned, so subsequent calls re-enter the unauthenticated state instead of
/// looping.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use identikit::config::ApiConfig;
/// use identikit::auth::SessionStore;
/// use identikit::http::ApiClient;
///
/// let session = Arc::new(SessionStore::default());
/// let client = ApiClient::new(ApiConfig::default(), session);
/// ```
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
    session: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(config: ApiConfig, session: Arc<SessionStore>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            http,
            config,
            session,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path, None::<&()>).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::DELETE, path, None::<&()>).await
    }

    async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut request = self.http.request(method, &url);
        for (name, value) in &self.config.default_headers {
            request = request.header(name, value);
        }
        request = request.header(CONTENT_TYPE, "application/json");
        if let Some(token) = self.session.get_token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                ApiError::Timeout(self.config.timeout.as_millis() as u64)
            } else {
                ApiError::Network(err.to_string())
            }
        })?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("application/json"))
            .unwrap_or(false);
        let text = response.text().await.map_err(ApiError::from)?;

        if !status.is_success() {
            return Err(self.error_from_response(status, is_json, &text));
        }

        if is_json {
            Ok(serde_json::from_str(&text)?)
        } else {
            // Plain-text bodies deserialize into String targets.
            Ok(serde_json::from_value(serde_json::Value::String(text))?)
        }
    }

    fn error_from_response(&self, status: StatusCode, is_json: bool, text: &str) -> ApiError {
        if status == StatusCode::UNAUTHORIZED {
            self.session.clear_token();
            return ApiError::Unauthorized("Please log in to continue".to_string());
        }
        let parsed: Option<ErrorBody> = is_json.then(|| serde_json::from_str(text).ok()).flatten();
        let (error, message) = match parsed {
            Some(body) => (
                body.error,
                body.message
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            ),
            None => (
                None,
                if text.is_empty() {
                    format!("HTTP {}", status.as_u16())
                } else {
                    text.to_string()
                },
            ),
        };
        ApiError::Api {
            status: status.as_u16(),
            error,
            message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}
