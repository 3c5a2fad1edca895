//! Event handling for Slack events.
//!
//! Only `app_mention` is acted on. Everything else that arrives over the
//! Socket Mode connection is parsed far enough to be acknowledged and then
//! dropped.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SlackError, SlackResult};

/// Author id used when Slack omits the `user` field.
pub const UNKNOWN_USER: &str = "unknown";

/// Slack event types that we handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEvent {
    /// App mention event (@bot in a channel).
    AppMention(AppMentionEvent),
    /// Unknown event type (for forward compatibility).
    #[serde(other)]
    Unknown,
}

/// Event payload for app mentions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppMentionEvent {
    /// User who mentioned the bot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Text of the message (including the mention).
    #[serde(default)]
    pub text: String,
    /// Channel where the mention occurred.
    pub channel: String,
    /// Timestamp of the message.
    pub ts: String,
    /// Thread root timestamp (if the mention is a thread reply).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    /// Event timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_ts: Option<String>,
    /// Bot ID (if the mention was posted by a bot).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
}

/// Socket Mode envelope wrapping events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketModeEnvelope {
    /// Envelope ID for acknowledgment. `hello` and `disconnect` carry none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub envelope_id: Option<String>,
    /// Type of payload.
    #[serde(rename = "type")]
    pub envelope_type: String,
    /// Actual payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<EventPayload>,
    /// Accepts response payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepts_response_payload: Option<bool>,
    /// Delivery attempt number when Slack is redelivering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_attempt: Option<u32>,
    /// Why Slack is redelivering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_reason: Option<String>,
    /// Reason given on a `disconnect` envelope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Event callback payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPayload {
    /// Team ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    /// API app ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_app_id: Option<String>,
    /// The actual event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<serde_json::Value>,
    /// Event type.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "type")]
    pub payload_type: Option<String>,
    /// Event ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Event time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_time: Option<u64>,
}

/// Socket Mode acknowledgment response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketModeAck {
    /// Envelope ID being acknowledged.
    pub envelope_id: String,
}

impl SocketModeAck {
    /// Create a simple acknowledgment.
    pub fn new(envelope_id: impl Into<String>) -> Self {
        Self {
            envelope_id: envelope_id.into(),
        }
    }
}

/// Remove every `<@...>` mention token from `text` and trim the ends.
///
/// Interior text, including the whitespace around a removed token, is kept
/// as is. An empty token (`<@>`) is not a mention and stays.
///
/// # Example
///
/// ```rust
/// use relay_slack::events::strip_mentions;
///
/// assert_eq!(strip_mentions("<@U12345> summarize this"), "summarize this");
/// assert_eq!(strip_mentions("ask <@U1|ann> and <@U2>"), "ask  and");
/// ```
pub fn strip_mentions(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("<@") {
        let after = &rest[start + 2..];
        match after.find('>') {
            Some(end) if end > 0 => {
                result.push_str(&rest[..start]);
                rest = &after[end + 1..];
            }
            Some(_) => {
                // `<@>`: keep the `<` and rescan from the `@`
                result.push_str(&rest[..=start]);
                rest = &rest[start + 1..];
            }
            None => break,
        }
    }
    result.push_str(rest);

    result.trim().to_string()
}

/// Context for processing an event.
#[derive(Debug, Clone)]
pub struct EventContext {
    /// User ID who triggered the event.
    pub user_id: String,
    /// Channel ID where the event occurred.
    pub channel_id: String,
    /// Thread root timestamp replies must go to.
    pub thread_ts: String,
    /// Original message timestamp.
    pub message_ts: String,
    /// Team ID.
    pub team_id: Option<String>,
}

impl EventContext {
    /// Create context from an app mention event.
    pub fn from_app_mention(event: &AppMentionEvent, team_id: Option<String>) -> Self {
        Self {
            user_id: event
                .user
                .clone()
                .unwrap_or_else(|| UNKNOWN_USER.to_string()),
            channel_id: event.channel.clone(),
            // A mention outside a thread starts one rooted at itself
            thread_ts: event.thread_ts.clone().unwrap_or_else(|| event.ts.clone()),
            message_ts: event.ts.clone(),
            team_id,
        }
    }
}

/// Trait for handling Slack events.
///
/// Returning `Ok(Some(text))` posts `text` into the mention's thread;
/// `Ok(None)` posts nothing.
#[async_trait::async_trait]
pub trait SlackEventHandler: Send + Sync {
    /// Handle an app mention event.
    async fn handle_app_mention(
        &self,
        event: AppMentionEvent,
        context: EventContext,
    ) -> SlackResult<Option<String>>;
}

/// Parse a raw event from the Socket Mode envelope.
pub fn parse_event(payload: &EventPayload) -> SlackResult<SlackEvent> {
    let event_json = payload
        .event
        .as_ref()
        .ok_or_else(|| SlackError::InvalidPayload("Missing event field".to_string()))?;

    let event_type = event_json
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or("unknown");

    debug!("Parsing event type: {}", event_type);

    match event_type {
        "app_mention" => {
            let event: AppMentionEvent = serde_json::from_value(event_json.clone())?;
            Ok(SlackEvent::AppMention(event))
        }
        _ => Ok(SlackEvent::Unknown),
    }
}
