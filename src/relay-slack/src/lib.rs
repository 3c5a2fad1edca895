//! Slack side of the Slack to Dify relay.
//!
//! This crate provides:
//! - A Slack bot speaking Socket Mode for real-time events
//! - `app_mention` parsing and mention stripping
//! - Threaded replies through `chat.postMessage`
//!
//! # Architecture
//!
//! `RelaySlackBot` owns the Socket Mode connection loop. Every envelope is
//! acknowledged first and then handed to a [`SlackEventHandler`] on its own
//! task, so a slow handler never stalls the socket. Whatever text the handler
//! returns is posted back into the thread the mention came from.
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_slack::{RelaySlackBot, SlackConfig};
//!
//! let config = SlackConfig::from_env()?;
//! let bot = RelaySlackBot::new(config).await?;
//! bot.set_event_handler(my_handler).await;
//! bot.start().await?;
//! ```
//!
//! # Configuration
//!
//! Required environment variables:
//! - `BOT_TOKEN` - Bot OAuth token (xoxb-...)
//! - `APP_TOKEN` - App-level token for Socket Mode (xapp-...)
//!
//! Optional:
//! - `SLACK_API_BASE_URL` - Web API base, mostly useful for tests

pub mod bot;
pub mod config;
pub mod error;
pub mod events;
pub mod messages;
pub mod web;

// Re-export main types
pub use bot::{BotOptions, RelaySlackBot};
pub use config::SlackConfig;
pub use error::{SlackError, SlackResult};
pub use events::{AppMentionEvent, EventContext, SlackEvent, SlackEventHandler, strip_mentions};
pub use messages::{SlackMessageContent, split_message};
pub use web::SlackWebClient;
