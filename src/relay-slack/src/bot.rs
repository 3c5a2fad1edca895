//! Socket Mode bot.
//!
//! The `RelaySlackBot`:
//! - Connects to Slack via Socket Mode (WebSocket)
//! - Acknowledges every envelope before doing any work on it
//! - Runs each `app_mention` through the installed handler on its own task
//! - Posts the handler's answer back into the mention's thread
//! - Reconnects when Slack asks it to or the socket drops
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_slack::{RelaySlackBot, SlackConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SlackConfig::from_env()?;
//!     let bot = RelaySlackBot::new(config).await?;
//!
//!     // Runs until `shutdown()` is called
//!     bot.start().await?;
//!
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{RwLock, mpsc};
use tokio::time::interval;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::config::SlackConfig;
use crate::error::{SlackError, SlackResult};
use crate::events::{
    AppMentionEvent, EventContext, EventPayload, SlackEvent, SlackEventHandler, SocketModeAck,
    SocketModeEnvelope, parse_event,
};
use crate::web::SlackWebClient;

/// Type alias for the WebSocket connection.
type WsConnection = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Reply posted when no handler has been installed.
const NO_HANDLER_REPLY: &str = "I received your message, but no handler is configured.";

/// Configuration for bot behavior.
#[derive(Debug, Clone)]
pub struct BotOptions {
    /// Timeout for Web API requests.
    pub api_timeout: Duration,
    /// Delay between reconnection attempts.
    pub reconnect_delay: Duration,
    /// Ping interval for WebSocket keep-alive.
    pub ping_interval: Duration,
    /// How long `start` waits for in-flight handlers after shutdown.
    pub shutdown_grace: Duration,
}

impl Default for BotOptions {
    fn default() -> Self {
        Self {
            api_timeout: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
            ping_interval: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

/// How a single Socket Mode session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Shutdown was requested.
    Shutdown,
    /// Slack closed or asked us to drop the connection; open a new one.
    Reconnect,
}

/// The relay's Slack bot.
pub struct RelaySlackBot {
    /// Web API client.
    web: SlackWebClient,
    /// Bot options.
    options: BotOptions,
    /// Bot's own user ID (set after `auth.test`).
    bot_user_id: Arc<RwLock<Option<String>>>,
    /// Cancelled on shutdown; observed by the socket loop and handler tasks.
    shutdown: CancellationToken,
    /// In-flight handler tasks.
    tasks: TaskTracker,
    /// Event handler (optional).
    event_handler: Arc<RwLock<Option<Arc<dyn SlackEventHandler>>>>,
}

impl RelaySlackBot {
    /// Create a new Slack bot with the given configuration.
    pub async fn new(config: SlackConfig) -> SlackResult<Self> {
        Self::with_options(config, BotOptions::default()).await
    }

    /// Create a new bot with custom options.
    pub async fn with_options(config: SlackConfig, options: BotOptions) -> SlackResult<Self> {
        config.validate()?;

        let web = SlackWebClient::new(config, options.api_timeout)?;

        Ok(Self {
            web,
            options,
            bot_user_id: Arc::new(RwLock::new(None)),
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
            event_handler: Arc::new(RwLock::new(None)),
        })
    }

    /// Set the event handler for processing events.
    pub async fn set_event_handler<H: SlackEventHandler + 'static>(&self, handler: H) {
        let mut guard = self.event_handler.write().await;
        *guard = Some(Arc::new(handler));
    }

    /// Get the bot's user ID (if known).
    pub async fn bot_user_id(&self) -> Option<String> {
        self.bot_user_id.read().await.clone()
    }

    /// Web API client used for replies.
    pub fn web(&self) -> &SlackWebClient {
        &self.web
    }

    /// A token that is cancelled when the bot shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Start the bot and run until shutdown.
    pub async fn start(&self) -> SlackResult<()> {
        info!("Starting Slack relay bot...");

        self.test_auth().await?;

        let result = self.run_socket_mode().await;

        self.tasks.close();
        if tokio::time::timeout(self.options.shutdown_grace, self.tasks.wait())
            .await
            .is_err()
        {
            warn!(
                "{} handler task(s) still running after {:?}",
                self.tasks.len(),
                self.options.shutdown_grace
            );
        }

        result
    }

    /// Shutdown the bot gracefully.
    pub fn shutdown(&self) {
        info!("Shutting down Slack bot...");
        self.shutdown.cancel();
    }

    /// Test authentication by calling auth.test.
    async fn test_auth(&self) -> SlackResult<()> {
        debug!("Testing Slack authentication...");

        let identity = self.web.auth_test().await?;
        info!("Authenticated as bot user: {}", identity.user_id);

        let mut guard = self.bot_user_id.write().await;
        *guard = Some(identity.user_id);

        Ok(())
    }

    /// Run the Socket Mode connection loop.
    async fn run_socket_mode(&self) -> SlackResult<()> {
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let session = match self.web.open_socket_url().await {
                Ok(ws_url) => {
                    info!("Connecting to Socket Mode...");
                    self.connect_and_run(&ws_url).await
                }
                Err(e @ (SlackError::Auth(_) | SlackError::Config(_))) => return Err(e),
                Err(e) => Err(e),
            };

            match session {
                Ok(SessionEnd::Shutdown) => {
                    info!("Socket Mode connection closed gracefully");
                    break;
                }
                Ok(SessionEnd::Reconnect) => {
                    info!("Socket Mode session ended, reconnecting");
                }
                Err(e) => {
                    error!("Socket Mode connection error: {}", e);

                    info!("Reconnecting in {:?}...", self.options.reconnect_delay);
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.options.reconnect_delay) => {}
                    }
                }
            }
        }

        Ok(())
    }

    /// Connect to WebSocket and run event loop.
    async fn connect_and_run(&self, ws_url: &str) -> SlackResult<SessionEnd> {
        let (ws_stream, _) = connect_async(ws_url).await?;
        let (mut write, read) = ws_stream.split();

        // Channel for outgoing messages
        let (msg_tx, mut msg_rx) = mpsc::channel::<WsMessage>(100);

        let write_task = tokio::spawn(async move {
            while let Some(msg) = msg_rx.recv().await {
                if let Err(e) = write.send(msg).await {
                    error!("Failed to send WebSocket message: {}", e);
                    break;
                }
            }
        });

        let ping_tx = msg_tx.clone();
        let ping_interval = self.options.ping_interval;
        let ping_task = tokio::spawn(async move {
            let mut interval = interval(ping_interval);
            loop {
                interval.tick().await;
                if ping_tx.send(WsMessage::Ping(vec![])).await.is_err() {
                    break;
                }
            }
        });

        let result = self.process_messages(read, msg_tx).await;

        ping_task.abort();
        write_task.abort();

        result
    }

    /// Process incoming WebSocket messages.
    async fn process_messages(
        &self,
        mut read: SplitStream<WsConnection>,
        msg_tx: mpsc::Sender<WsMessage>,
    ) -> SlackResult<SessionEnd> {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Received shutdown signal");
                    return Ok(SessionEnd::Shutdown);
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(WsMessage::Text(text))) => {
                            if let Some(end) = self.handle_socket_message(&text, &msg_tx).await {
                                return Ok(end);
                            }
                        }
                        Some(Ok(WsMessage::Ping(data))) => {
                            let _ = msg_tx.send(WsMessage::Pong(data)).await;
                        }
                        Some(Ok(WsMessage::Pong(_))) => {}
                        Some(Ok(WsMessage::Close(_))) => {
                            info!("WebSocket closed by server");
                            return Ok(SessionEnd::Reconnect);
                        }
                        Some(Err(e)) => {
                            return Err(SlackError::WebSocket(e.to_string()));
                        }
                        None => {
                            return Ok(SessionEnd::Reconnect);
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    /// Handle a Socket Mode message. Returns `Some` when the session should end.
    async fn handle_socket_message(
        &self,
        text: &str,
        msg_tx: &mpsc::Sender<WsMessage>,
    ) -> Option<SessionEnd> {
        let envelope: SocketModeEnvelope = match serde_json::from_str(text) {
            Ok(env) => env,
            Err(e) => {
                warn!("Failed to parse Socket Mode envelope: {}", e);
                return None;
            }
        };

        // Always acknowledge first
        if let Some(envelope_id) = &envelope.envelope_id {
            match serde_json::to_string(&SocketModeAck::new(envelope_id)) {
                Ok(ack_json) => {
                    let _ = msg_tx.send(WsMessage::Text(ack_json)).await;
                }
                Err(e) => error!("Failed to encode ack for {}: {}", envelope_id, e),
            }
        }

        match envelope.envelope_type.as_str() {
            "events_api" => {
                if let Some(attempt) = envelope.retry_attempt.filter(|&a| a > 0) {
                    debug!(
                        "Slack redelivery attempt {} ({:?})",
                        attempt, envelope.retry_reason
                    );
                }
                if let Some(payload) = envelope.payload {
                    self.handle_event_payload(payload).await;
                }
                None
            }
            "hello" => {
                info!("Socket Mode connection established");
                None
            }
            "disconnect" => {
                info!(
                    "Received disconnect request from Slack ({})",
                    envelope.reason.as_deref().unwrap_or("no reason")
                );
                Some(SessionEnd::Reconnect)
            }
            other => {
                debug!("Ignoring envelope type: {}", other);
                None
            }
        }
    }

    /// Handle an events API payload.
    async fn handle_event_payload(&self, payload: EventPayload) {
        let team_id = payload.team_id.clone();

        match parse_event(&payload) {
            Ok(SlackEvent::AppMention(event)) => {
                if self.is_own_message(&event).await {
                    debug!("Ignoring mention authored by the bot itself");
                    return;
                }
                let ctx = EventContext::from_app_mention(&event, team_id);
                self.spawn_app_mention(event, ctx).await;
            }
            Ok(SlackEvent::Unknown) => {
                debug!("Received unhandled event type");
            }
            Err(e) => {
                warn!("Failed to parse event: {}", e);
            }
        }
    }

    async fn is_own_message(&self, event: &AppMentionEvent) -> bool {
        match (self.bot_user_id.read().await.as_deref(), event.user.as_deref()) {
            (Some(bot), Some(user)) => bot == user,
            _ => false,
        }
    }

    /// Run the handler for one mention on its own task.
    async fn spawn_app_mention(&self, event: AppMentionEvent, ctx: EventContext) {
        info!(
            "Handling app mention from user {} in channel {}",
            ctx.user_id, ctx.channel_id
        );

        let handler = self.event_handler.read().await.clone();
        let web = self.web.clone();
        let shutdown = self.shutdown.clone();

        self.tasks.spawn(async move {
            let channel = ctx.channel_id.clone();
            let thread_ts = ctx.thread_ts.clone();
            tokio::select! {
                _ = shutdown.cancelled() => {
                    warn!("Abandoning mention in {} thread {} on shutdown", channel, thread_ts);
                }
                _ = dispatch_app_mention(handler, web, event, ctx) => {}
            }
        });
    }
}

/// Run `handler` for one mention and post whatever it answers into the thread.
async fn dispatch_app_mention(
    handler: Option<Arc<dyn SlackEventHandler>>,
    web: SlackWebClient,
    event: AppMentionEvent,
    ctx: EventContext,
) {
    let reply = match handler {
        Some(handler) => match handler.handle_app_mention(event, ctx.clone()).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Event handler error: {}", e);
                Some(format!("Unexpected error: {}", e))
            }
        },
        None => Some(NO_HANDLER_REPLY.to_string()),
    };

    let Some(text) = reply else {
        return;
    };

    if let Err(e) = web
        .post_thread_reply(&ctx.channel_id, &ctx.thread_ts, &text)
        .await
    {
        error!(
            "Failed to send reply to {} thread {}: {}",
            ctx.channel_id, ctx.thread_ts, e
        );
    }
}
