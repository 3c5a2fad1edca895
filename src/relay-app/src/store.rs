//! Thread to conversation correlation.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use relay_slack::EventContext;

/// Identifies one Slack thread: `"{channel}:{thread_ts}"`.
///
/// Only ever used as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadKey(String);

impl ThreadKey {
    pub fn new(channel: &str, thread_ts: &str) -> Self {
        Self(format!("{}:{}", channel, thread_ts))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&EventContext> for ThreadKey {
    fn from(ctx: &EventContext) -> Self {
        Self::new(&ctx.channel_id, &ctx.thread_ts)
    }
}

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps threads to the Dify conversation they continue.
///
/// Entries live for the lifetime of the store; `set` always overwrites.
pub trait ConversationStore: Send + Sync {
    fn get(&self, key: &ThreadKey) -> Option<String>;
    fn set(&self, key: ThreadKey, conversation_id: String);
}

/// Process-local store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    entries: DashMap<ThreadKey, String>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn get(&self, key: &ThreadKey) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: ThreadKey, conversation_id: String) {
        self.entries.insert(key, conversation_id);
    }
}

/// One async lock per thread, created on first use.
///
/// Holding a thread's guard across the lookup, the Dify call and the store
/// update makes mentions in the same thread run one after another. Locks are
/// never removed, so the map grows with every thread seen for the life of the
/// process, like the conversation store itself.
#[derive(Debug, Default, Clone)]
pub struct ThreadLocks {
    locks: Arc<DashMap<ThreadKey, Arc<Mutex<()>>>>,
}

impl ThreadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`'s thread.
    pub async fn lock(&self, key: &ThreadKey) -> OwnedMutexGuard<()> {
        // Clone the Arc out first so the map shard is not held across the await
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}
