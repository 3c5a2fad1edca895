//! Dify chat client for the Slack to Dify relay.
//!
//! Sends one streaming `chat-messages` request per question and folds the
//! server-sent-event stream that comes back into a single answer plus the
//! conversation id Dify wants reused for the next turn.

mod aggregator;
mod client;
mod config;
mod models;
mod sse;

pub use aggregator::{Answer, ChatReply, ResponseAggregator};
pub use client::DifyClient;
pub use config::DifyConfig;
pub use models::{ChatRequest, EventKind, ResponseMode, StreamEvent};
pub use sse::{LineBuffer, SseLine, parse_line};

/// Path of the chat endpoint, relative to the configured base URL.
pub const CHAT_MESSAGES_PATH: &str = "/v1/chat-messages";

/// Text posted in place of an answer when Dify streamed nothing usable.
pub const EMPTY_ANSWER_PLACEHOLDER: &str = "(Dify returned an empty answer.)";

/// Error types for Dify operations
#[derive(Debug, thiserror::Error)]
pub enum DifyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{status} from {url}: {body}")]
    Http {
        status: reqwest::StatusCode,
        url: String,
        body: String,
    },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DifyError {
    /// Whether Dify answered with a non-success HTTP status.
    pub fn is_http(&self) -> bool {
        matches!(self, DifyError::Http { .. })
    }
}

/// Result type for Dify operations
pub type Result<T> = std::result::Result<T, DifyError>;
