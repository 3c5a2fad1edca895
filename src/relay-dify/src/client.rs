//! Dify chat client implementation

use futures::StreamExt;
use tracing::{debug, warn};

use crate::aggregator::{ChatReply, ResponseAggregator};
use crate::config::DifyConfig;
use crate::models::{ChatRequest, EventKind};
use crate::sse::{LineBuffer, SseLine, parse_line};
use crate::{DifyError, Result};

/// Client for one Dify app's chat endpoint
#[derive(Clone)]
pub struct DifyClient {
    client: reqwest::Client,
    config: DifyConfig,
}

impl std::fmt::Debug for DifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DifyClient")
            .field("config", &self.config)
            .finish()
    }
}

impl DifyClient {
    /// Create a client from validated configuration.
    pub fn new(config: DifyConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| DifyError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Ask one question and wait for the streamed answer.
    ///
    /// `conversation_id` continues an existing conversation; `None` starts a
    /// new one. Reading stops at the terminator even if the server keeps the
    /// connection open. Dropping the returned future aborts the request.
    pub async fn chat(
        &self,
        query: &str,
        user: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatReply> {
        let url = self.config.chat_messages_url();
        let request = ChatRequest::streaming(query, user, conversation_id);

        debug!(
            "Sending chat request to {} (query {} chars, continuing: {})",
            url,
            query.chars().count(),
            request.conversation_id.is_some()
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key())
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DifyError::Http { status, url, body });
        }

        let mut aggregator = ResponseAggregator::new(request.conversation_id.as_deref());
        let mut lines = LineBuffer::new();
        let mut stream = response.bytes_stream();

        let mut done = false;
        'read: while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for line in lines.push(&chunk) {
                if !absorb_line(&mut aggregator, &line) {
                    done = true;
                    break 'read;
                }
            }
        }

        // Whatever follows the terminator, buffered or not, is never read
        if let Some(line) = lines.finish().filter(|_| !done) {
            absorb_line(&mut aggregator, &line);
        }

        debug!("Chat stream finished with {} events", aggregator.len());
        Ok(aggregator.finish())
    }
}

/// Feed one line to the aggregator. Returns `false` once the terminator is seen.
fn absorb_line(aggregator: &mut ResponseAggregator, line: &str) -> bool {
    match parse_line(line) {
        SseLine::Done => return false,
        SseLine::Event(event) => {
            if matches!(&event.kind, EventKind::Other(kind) if kind == "error") {
                warn!(
                    "Dify stream reported an error: {}",
                    event.message.as_deref().unwrap_or("no message")
                );
            }
            aggregator.push(event);
        }
        SseLine::Malformed => debug!("Skipping malformed stream line"),
        SseLine::Ignored => {}
    }
    true
}
