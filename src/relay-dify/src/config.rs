//! Dify connection settings.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::{CHAT_MESSAGES_PATH, DifyError, Result};

/// Environment variable holding the Dify app API key.
pub const ENV_API_KEY: &str = "DIFY_API_KEY";
/// Environment variable holding the Dify base URL.
pub const ENV_BASE_URL: &str = "DIFY_BASE_URL";
/// Environment variable overriding the connect timeout, in seconds.
pub const ENV_CONNECT_TIMEOUT: &str = "DIFY_CONNECT_TIMEOUT_SECS";
/// Environment variable overriding the total request timeout, in seconds.
pub const ENV_REQUEST_TIMEOUT: &str = "DIFY_REQUEST_TIMEOUT_SECS";

/// Time allowed to establish the connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Time allowed for the whole streamed response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Settings for talking to one Dify app.
#[derive(Clone)]
pub struct DifyConfig {
    api_key: SecretString,
    base_url: String,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl std::fmt::Debug for DifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DifyConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl DifyConfig {
    /// Create a configuration with the default timeouts.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into().into()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override both timeouts.
    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `DIFY_API_KEY`
    /// - `DIFY_BASE_URL`
    ///
    /// Optional variables:
    /// - `DIFY_CONNECT_TIMEOUT_SECS` (default 10)
    /// - `DIFY_REQUEST_TIMEOUT_SECS` (default 300)
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(ENV_API_KEY)
            .map_err(|_| DifyError::Config(format!("{} not set", ENV_API_KEY)))?;
        let base_url = std::env::var(ENV_BASE_URL)
            .map_err(|_| DifyError::Config(format!("{} not set", ENV_BASE_URL)))?;

        let connect = timeout_from_env(ENV_CONNECT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)?;
        let request = timeout_from_env(ENV_REQUEST_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)?;

        Ok(Self::new(base_url.trim(), api_key).with_timeouts(connect, request))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(DifyError::Config("Dify API key is empty".to_string()));
        }

        let url = Url::parse(&self.base_url)
            .map_err(|e| DifyError::Config(format!("Invalid Dify base URL: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DifyError::Config(format!(
                "Dify base URL must be http(s): {}",
                self.base_url
            )));
        }

        if self.connect_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(DifyError::Config("Dify timeouts must be positive".to_string()));
        }

        Ok(())
    }

    /// The API key.
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of the chat endpoint.
    pub fn chat_messages_url(&self) -> String {
        format!("{}{}", self.base_url, CHAT_MESSAGES_PATH)
    }

    /// Connection establishment timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Total request timeout.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

fn timeout_from_env(var: &str, default: Duration) -> Result<Duration> {
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| DifyError::Config(format!("{} must be a whole number of seconds", var))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DifyConfig::new("https://api.dify.ai/", "app-key");
        assert_eq!(config.base_url(), "https://api.dify.ai");
        assert_eq!(config.api_key(), "app-key");
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.request_timeout(), Duration::from_secs(300));
        assert_eq!(
            config.chat_messages_url(),
            "https://api.dify.ai/v1/chat-messages"
        );
    }

    #[test]
    fn test_validate() {
        assert!(DifyConfig::new("https://api.dify.ai", "app-key").validate().is_ok());
        assert!(DifyConfig::new("http://localhost:5001", "app-key").validate().is_ok());
        assert!(DifyConfig::new("https://api.dify.ai", " ").validate().is_err());
        assert!(DifyConfig::new("api.dify.ai", "app-key").validate().is_err());
        assert!(DifyConfig::new("ftp://api.dify.ai", "app-key").validate().is_err());
        assert!(
            DifyConfig::new("https://api.dify.ai", "app-key")
                .with_timeouts(Duration::ZERO, Duration::from_secs(1))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = DifyConfig::new("https://api.dify.ai", "app-secret-key");
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("app-secret-key"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}
