//! Line framing for Dify's server-sent-event stream.

use serde_json::Value;

use crate::models::StreamEvent;

const DATA_PREFIX: &str = "data:";

/// Outcome of classifying one stream line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// Not a `data:` line (comments, `event:` lines, blank separators).
    Ignored,
    /// The terminator sentinel. Stop reading.
    Done,
    /// A decoded event.
    Event(StreamEvent),
    /// A `data:` line whose payload is not a JSON object.
    Malformed,
}

/// Classify one line of the stream.
///
/// The line must already be stripped of its line terminator. The payload
/// after `data:` is trimmed before inspection; `DONE` and `[DONE]` in any
/// case end the stream.
pub fn parse_line(line: &str) -> SseLine {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return SseLine::Ignored;
    };
    let payload = payload.trim();

    if payload.eq_ignore_ascii_case("[DONE]") || payload.eq_ignore_ascii_case("DONE") {
        return SseLine::Done;
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(value) => StreamEvent::from_value(&value).map_or(SseLine::Malformed, SseLine::Event),
        Err(_) => SseLine::Malformed,
    }
}

/// Reassembles complete lines from arbitrarily split body chunks.
///
/// Bytes are held until a `\n` arrives so multi-byte characters and JSON
/// payloads that straddle chunk boundaries decode intact.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_line(&raw[..raw.len() - 1]));
        }
        lines
    }

    /// Return the trailing partial line, if any, once the body has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        Some(decode_line(&raw))
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
