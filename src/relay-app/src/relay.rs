//! Turns one Slack mention into one Dify round trip.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use relay_dify::{DifyClient, DifyError};
use relay_slack::{AppMentionEvent, EventContext, SlackEventHandler, SlackResult, strip_mentions};

use crate::store::{ConversationStore, ThreadKey, ThreadLocks};

/// Reply for a mention with nothing but mention tokens in it.
pub const EMPTY_QUERY_REPLY: &str = "Type your question after mentioning me";

/// Relays mentions to Dify, keeping one Dify conversation per Slack thread.
pub struct MentionRelay {
    dify: DifyClient,
    store: Arc<dyn ConversationStore>,
    locks: ThreadLocks,
}

impl MentionRelay {
    pub fn new(dify: DifyClient, store: Arc<dyn ConversationStore>) -> Self {
        Self {
            dify,
            store,
            locks: ThreadLocks::new(),
        }
    }

    /// Produce the thread reply for a mention's raw `text`.
    ///
    /// Never fails: backend and transport errors come back as reply text.
    /// The stored conversation id only changes after a successful call that
    /// reported a non-empty id.
    pub async fn respond(&self, text: &str, ctx: &EventContext) -> String {
        let query = strip_mentions(text);
        if query.is_empty() {
            return EMPTY_QUERY_REPLY.to_string();
        }

        let key = ThreadKey::from(ctx);
        let _guard = self.locks.lock(&key).await;

        let prior = self.store.get(&key);
        debug!(
            "Relaying {} char query for {} (continuing: {})",
            query.chars().count(),
            key,
            prior.is_some()
        );

        match self.dify.chat(&query, &ctx.user_id, prior.as_deref()).await {
            Ok(reply) => {
                if let Some(id) = reply.conversation_id.filter(|id| !id.is_empty()) {
                    if prior.as_deref() != Some(id.as_str()) {
                        info!("Thread {} now maps to conversation {}", key, id);
                    }
                    self.store.set(key, id);
                }
                reply.answer.text_or_placeholder().to_string()
            }
            Err(e @ DifyError::Http { .. }) => {
                error!("Dify HTTP error for {}: {}", key, e);
                format!("Dify HTTP error: {}", e)
            }
            Err(e) => {
                error!("Relay failed for {}: {}", key, e);
                format!("Unexpected error: {}", e)
            }
        }
    }
}

#[async_trait]
impl SlackEventHandler for MentionRelay {
    async fn handle_app_mention(
        &self,
        event: AppMentionEvent,
        context: EventContext,
    ) -> SlackResult<Option<String>> {
        Ok(Some(self.respond(&event.text, &context).await))
    }
}
