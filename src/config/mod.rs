//! Client configuration.

use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.scum.dog";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_USER_AGENT: &str = "identikit-rs/0.1";

/// Base settings for talking to the Identikit service.
///
/// # Example
/// ```
/// use identikit::config::ApiConfig;
///
/// let config = ApiConfig::new("https://api.example.test")
///     .with_timeout(std::time::Duration::from_secs(5));
/// assert_eq!(config.base_url, "https://api.example.test");
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Service origin, without a trailing slash.
    pub base_url: String,
    /// Per-request deadline.
    pub timeout: Duration,
    /// Extra headers sent with every request.
    pub default_headers: HashMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut default_headers = HashMap::new();
        default_headers.insert("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string());
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            default_headers,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }
}
