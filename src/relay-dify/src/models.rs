//! Request and stream-event types for the Dify chat endpoint.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How Dify should deliver the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Server-sent events, one per answer fragment.
    Streaming,
}

/// Body of a `POST /v1/chat-messages` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    /// App input variables. The relay never sets any.
    pub inputs: HashMap<String, Value>,
    /// The user's question.
    pub query: String,
    pub response_mode: ResponseMode,
    /// Caller identity as Dify should record it.
    pub user: String,
    /// Omitted entirely when starting a new conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl ChatRequest {
    /// Build a streaming request.
    ///
    /// An empty `conversation_id` is treated the same as none, so the field
    /// never goes out as `""`.
    pub fn streaming(
        query: impl Into<String>,
        user: impl Into<String>,
        conversation_id: Option<&str>,
    ) -> Self {
        Self {
            inputs: HashMap::new(),
            query: query.into(),
            response_mode: ResponseMode::Streaming,
            user: user.into(),
            conversation_id: conversation_id
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        }
    }
}

/// The `event` tag of a stream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    AgentThought,
    AgentMessage,
    /// Any other kind (`message_end`, `error`, `ping`, ...).
    Other(String),
}

impl From<&str> for EventKind {
    fn from(kind: &str) -> Self {
        match kind {
            "agent_thought" => EventKind::AgentThought,
            "agent_message" => EventKind::AgentMessage,
            other => EventKind::Other(other.to_string()),
        }
    }
}

/// One decoded `data:` payload.
///
/// Only string-valued fields are kept; a field holding any other JSON type
/// reads as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub kind: EventKind,
    pub thought: Option<String>,
    pub answer: Option<String>,
    pub conversation_id: Option<String>,
    /// Error text carried by `error` events.
    pub message: Option<String>,
}

impl StreamEvent {
    /// Decode an event from a parsed JSON value.
    ///
    /// Returns `None` when the value is not a JSON object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let string_field = |name: &str| {
            object
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        Some(Self {
            kind: EventKind::from(object.get("event").and_then(Value::as_str).unwrap_or("")),
            thought: string_field("thought"),
            answer: string_field("answer"),
            conversation_id: string_field("conversation_id"),
            message: string_field("message"),
        })
    }

    /// Non-empty conversation id carried by this event.
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Non-empty thought text, for `agent_thought` events only.
    pub fn thought(&self) -> Option<&str> {
        match self.kind {
            EventKind::AgentThought => self.thought.as_deref().filter(|t| !t.is_empty()),
            _ => None,
        }
    }

    /// Answer fragment, for `agent_message` events only.
    pub fn answer_fragment(&self) -> Option<&str> {
        match self.kind {
            EventKind::AgentMessage => self.answer.as_deref(),
            _ => None,
        }
    }
}
