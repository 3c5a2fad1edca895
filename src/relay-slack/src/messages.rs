//! Outgoing message content and long-reply chunking.

use serde::{Deserialize, Serialize};

/// Longest text (in characters) sent in a single `chat.postMessage`.
///
/// Slack truncates at 40k characters but renders poorly long before that.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Slack message content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackMessageContent {
    /// Message text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Thread timestamp (for replies).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

impl SlackMessageContent {
    /// Create a new message content.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set thread timestamp (for replies).
    pub fn in_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Prefers breaking after a newline, then after whitespace, and only cuts
/// mid-word when a chunk has neither. Concatenating the chunks gives back
/// the input.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.chars().count() > max_chars {
        // Byte offset just past the `max_chars`-th character
        let window_end = rest
            .char_indices()
            .nth(max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        let window = &rest[..window_end];

        let cut = window
            .rfind('\n')
            .or_else(|| window.rfind(char::is_whitespace))
            .map(|idx| idx + window[idx..].chars().next().map_or(1, char::len_utf8))
            .unwrap_or(window_end);

        chunks.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }

    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest.to_string());
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_message_content_thread() {
        let message = SlackMessageContent::new()
            .with_text("Reply")
            .in_thread("1234567890.123456");

        assert_eq!(message.thread_ts, Some("1234567890.123456".to_string()));
        assert_eq!(message.text.as_deref(), Some("Reply"));
    }

    #[test]
    fn test_message_content_serialization_skips_unset() {
        let message = SlackMessageContent::new().with_text("hi");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            serde_json::json!({"text": "hi"})
        );
    }

    #[test]
    fn test_split_short_message() {
        assert_eq!(split_message("hello", 10), vec!["hello".to_string()]);
        assert_eq!(split_message("", 10), vec![String::new()]);
    }

    #[test]
    fn test_split_prefers_newlines() {
        let chunks = split_message("first line\nsecond line", 15);
        assert_eq!(chunks, vec!["first line\n".to_string(), "second line".to_string()]);
    }

    #[test]
    fn test_split_falls_back_to_whitespace() {
        let chunks = split_message("alpha beta gamma", 8);
        assert_eq!(
            chunks,
            vec!["alpha ".to_string(), "beta ".to_string(), "gamma".to_string()]
        );
    }

    #[test]
    fn test_split_hard_cut_without_breaks() {
        let chunks = split_message("abcdefghij", 4);
        assert_eq!(
            chunks,
            vec!["abcd".to_string(), "efgh".to_string(), "ij".to_string()]
        );
    }

    #[test]
    fn test_split_respects_char_boundaries() {
        let text = "éééééé";
        let chunks = split_message(text, 4);
        assert_eq!(chunks, vec!["éééé".to_string(), "éé".to_string()]);
        assert_eq!(chunks.concat(), text);
    }
}
