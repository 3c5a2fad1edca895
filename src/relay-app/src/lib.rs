//! Slack to Dify relay.
//!
//! Wires the Slack Socket Mode bot to the Dify chat client: every mention is
//! answered in its thread, and each thread keeps talking to the same Dify
//! conversation for as long as the process runs.

pub mod config;
pub mod relay;
pub mod store;

pub use config::{ConfigError, RelayConfig};
pub use relay::{EMPTY_QUERY_REPLY, MentionRelay};
pub use store::{ConversationStore, InMemoryConversationStore, ThreadKey, ThreadLocks};
