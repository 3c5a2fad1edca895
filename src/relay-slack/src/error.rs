//! Error types for the Slack side of the relay.
//!
//! Covers configuration problems, Web API failures, and Socket Mode
//! connection issues.

use thiserror::Error;

/// Errors that can occur during Slack operations.
#[derive(Error, Debug)]
pub enum SlackError {
    /// Configuration error (missing or invalid config).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication error (invalid token, revoked app, etc.).
    #[error("Authentication error: {0}")]
    Auth(String),

    /// API request failed.
    #[error("Slack API error: {0}")]
    Api(String),

    /// API rate limited.
    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// WebSocket connection error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Operation timed out.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Channel not found or bot not in channel.
    #[error("Channel error: {0}")]
    Channel(String),

    /// Invalid payload received from Slack.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for SlackError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SlackError::Timeout(err.to_string())
        } else if err.is_connect() {
            SlackError::Network(format!("Connection failed: {}", err))
        } else {
            SlackError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SlackError {
    fn from(err: serde_json::Error) -> Self {
        SlackError::Json(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SlackError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        SlackError::WebSocket(err.to_string())
    }
}

/// Result type for Slack operations.
pub type SlackResult<T> = std::result::Result<T, SlackError>;

/// A Slack Web API `"ok": false` response.
#[derive(Debug, Clone)]
pub struct SlackApiError {
    /// Error code from Slack (e.g., "channel_not_found").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl SlackApiError {
    /// Create a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Build an error from the body of a failed Web API call.
    pub fn from_response(method: &str, body: &serde_json::Value) -> Self {
        let code = body
            .get("error")
            .and_then(|e| e.as_str())
            .unwrap_or("unknown");
        Self::new(code, format!("{} failed: {}", method, code))
    }
}

impl From<SlackApiError> for SlackError {
    fn from(err: SlackApiError) -> Self {
        match err.code.as_str() {
            "ratelimited" | "rate_limited" => SlackError::RateLimited {
                // Default retry after 30 seconds if not specified
                retry_after_secs: 30,
            },
            "invalid_auth" | "not_authed" | "account_inactive" | "token_revoked" => {
                SlackError::Auth(err.message)
            }
            "channel_not_found" | "not_in_channel" | "is_archived" => {
                SlackError::Channel(err.message)
            }
            _ => SlackError::Api(format!("{}: {}", err.code, err.message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SlackError::Config("missing token".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing token");

        let err = SlackError::RateLimited {
            retry_after_secs: 60,
        };
        assert_eq!(err.to_string(), "Rate limited: retry after 60 seconds");
    }

    #[test]
    fn test_api_error_conversion() {
        let api_err = SlackApiError::new("invalid_auth", "Token has been revoked");
        let slack_err: SlackError = api_err.into();
        assert!(matches!(slack_err, SlackError::Auth(_)));

        let api_err = SlackApiError::new("not_in_channel", "Bot is not in channel");
        let slack_err: SlackError = api_err.into();
        assert!(matches!(slack_err, SlackError::Channel(_)));

        let api_err = SlackApiError::new("msg_too_long", "Message too long");
        let slack_err: SlackError = api_err.into();
        assert_eq!(
            slack_err.to_string(),
            "Slack API error: msg_too_long: Message too long"
        );
    }

    #[test]
    fn test_api_error_from_response() {
        let body = serde_json::json!({"ok": false, "error": "channel_not_found"});
        let err = SlackApiError::from_response("chat.postMessage", &body);
        assert_eq!(err.code, "channel_not_found");
        assert_eq!(err.message, "chat.postMessage failed: channel_not_found");

        let err = SlackApiError::from_response("auth.test", &serde_json::json!({"ok": false}));
        assert_eq!(err.code, "unknown");
    }
}
