//! Folds stream events into a final answer and conversation id.

use crate::EMPTY_ANSWER_PLACEHOLDER;
use crate::models::StreamEvent;

/// The answer chosen from one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// The most recent non-empty `agent_thought`.
    Thought(String),
    /// All `agent_message` fragments joined in order and trimmed.
    Reconstructed(String),
    /// Nothing usable was streamed.
    Empty,
}

impl Answer {
    /// Select the answer for a complete event sequence.
    ///
    /// A non-empty thought always beats the message fragments, and the
    /// latest such thought wins. A thought that is only whitespace still
    /// wins, and yields no answer.
    pub fn select(events: &[StreamEvent]) -> Self {
        if let Some(thought) = events.iter().rev().find_map(StreamEvent::thought) {
            if thought.trim().is_empty() {
                return Answer::Empty;
            }
            return Answer::Thought(thought.to_string());
        }

        let joined: String = events
            .iter()
            .filter_map(StreamEvent::answer_fragment)
            .collect();
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            Answer::Empty
        } else {
            Answer::Reconstructed(trimmed.to_string())
        }
    }

    /// The selected text, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Answer::Thought(text) | Answer::Reconstructed(text) => Some(text),
            Answer::Empty => None,
        }
    }

    /// The text to post, with the placeholder standing in for no answer.
    pub fn text_or_placeholder(&self) -> &str {
        self.text().unwrap_or(EMPTY_ANSWER_PLACEHOLDER)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Answer::Empty)
    }
}

/// Result of one chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub answer: Answer,
    /// Latest non-empty conversation id seen, else the one the request used.
    pub conversation_id: Option<String>,
}

/// Collects events for a single request.
#[derive(Debug, Default)]
pub struct ResponseAggregator {
    events: Vec<StreamEvent>,
    conversation_id: Option<String>,
}

impl ResponseAggregator {
    /// Start aggregating, seeded with the conversation id the request carried.
    pub fn new(prior_conversation_id: Option<&str>) -> Self {
        Self {
            events: Vec::new(),
            conversation_id: prior_conversation_id
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        }
    }

    /// Record one event.
    pub fn push(&mut self, event: StreamEvent) {
        if let Some(id) = event.conversation_id() {
            self.conversation_id = Some(id.to_string());
        }
        self.events.push(event);
    }

    /// Number of events recorded so far.
    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    /// Select the answer and hand back the conversation id.
    pub fn finish(self) -> ChatReply {
        ChatReply {
            answer: Answer::select(&self.events),
            conversation_id: self.conversation_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sse::{SseLine, parse_line};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn event(value: serde_json::Value) -> StreamEvent {
        StreamEvent::from_value(&value).unwrap()
    }

    fn aggregate(prior: Option<&str>, events: Vec<serde_json::Value>) -> ChatReply {
        let mut aggregator = ResponseAggregator::new(prior);
        for value in events {
            aggregator.push(event(value));
        }
        aggregator.finish()
    }

    #[test]
    fn test_fragments_used_when_thoughts_are_empty() {
        let reply = aggregate(
            None,
            vec![
                json!({"event": "agent_message", "answer": "Hel"}),
                json!({"event": "agent_message", "answer": "lo"}),
                json!({"event": "agent_thought", "thought": ""}),
            ],
        );
        assert_eq!(reply.answer, Answer::Reconstructed("Hello".to_string()));
    }

    #[test]
    fn test_last_thought_wins() {
        let reply = aggregate(
            None,
            vec![
                json!({"event": "agent_thought", "thought": "first"}),
                json!({"event": "agent_thought", "thought": "second"}),
            ],
        );
        assert_eq!(reply.answer, Answer::Thought("second".to_string()));
    }

    #[test]
    fn test_thought_beats_message_fragments() {
        let reply = aggregate(
            None,
            vec![
                json!({"event": "agent_thought", "thought": "reasoning"}),
                json!({"event": "agent_message", "answer": "literal reply"}),
                json!({"event": "agent_thought", "thought": ""}),
            ],
        );
        assert_eq!(reply.answer, Answer::Thought("reasoning".to_string()));
    }

    #[test]
    fn test_blank_thought_gives_placeholder() {
        let reply = aggregate(
            None,
            vec![
                json!({"event": "agent_message", "answer": "literal reply"}),
                json!({"event": "agent_thought", "thought": "  \n "}),
            ],
        );
        assert_eq!(reply.answer, Answer::Empty);
        assert_eq!(reply.answer.text_or_placeholder(), EMPTY_ANSWER_PLACEHOLDER);
    }

    #[test]
    fn test_reconstructed_answer_is_trimmed() {
        let reply = aggregate(
            None,
            vec![
                json!({"event": "agent_message", "answer": "  Hi"}),
                json!({"event": "agent_message"}),
                json!({"event": "agent_message", "answer": 5}),
                json!({"event": "message", "answer": "ignored"}),
                json!({"event": "agent_message", "answer": " there \n"}),
            ],
        );
        assert_eq!(reply.answer, Answer::Reconstructed("Hi there".to_string()));
    }

    #[test]
    fn test_empty_stream_gives_placeholder() {
        let reply = aggregate(None, vec![]);
        assert_eq!(reply.answer, Answer::Empty);
        assert_eq!(reply.answer.text_or_placeholder(), EMPTY_ANSWER_PLACEHOLDER);

        let reply = aggregate(
            None,
            vec![
                json!({"event": "agent_thought", "thought": ""}),
                json!({"event": "agent_message", "answer": "   "}),
            ],
        );
        assert!(reply.answer.is_empty());
        assert_eq!(reply.answer.text(), None);
    }

    #[test]
    fn test_later_conversation_id_wins() {
        let reply = aggregate(
            Some("c0"),
            vec![
                json!({"event": "agent_message", "conversation_id": "c1"}),
                json!({"event": "agent_message", "conversation_id": ""}),
                json!({"event": "agent_message", "conversation_id": "c2"}),
                json!({"event": "message_end"}),
            ],
        );
        assert_eq!(reply.conversation_id.as_deref(), Some("c2"));
    }

    #[test]
    fn test_prior_conversation_id_kept_when_not_reannounced() {
        let reply = aggregate(
            Some("c0"),
            vec![json!({"event": "agent_message", "answer": "ok"})],
        );
        assert_eq!(reply.conversation_id.as_deref(), Some("c0"));

        let reply = aggregate(None, vec![]);
        assert_eq!(reply.conversation_id, None);
    }

    #[test]
    fn test_bad_lines_do_not_stop_aggregation() {
        let mut aggregator = ResponseAggregator::new(None);
        let lines = [
            r#"data: {"event": "agent_message", "answer": "A"}"#,
            "data: {broken",
            "event: ping",
            r#"data: {"event": "agent_message", "answer": "B"}"#,
        ];
        for line in lines {
            if let SseLine::Event(event) = parse_line(line) {
                aggregator.push(event);
            }
        }
        assert_eq!(aggregator.len(), 2);
        assert_eq!(
            aggregator.finish().answer,
            Answer::Reconstructed("AB".to_string())
        );
    }
}
