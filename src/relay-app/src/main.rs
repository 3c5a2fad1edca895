//! Slack to Dify relay binary.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use relay_app::{InMemoryConversationStore, MentionRelay, RelayConfig};
use relay_dify::DifyClient;
use relay_slack::config::SlackConfigMetadata;
use relay_slack::{BotOptions, RelaySlackBot};

/// Answer Slack mentions with a Dify app, one conversation per thread
#[derive(Parser)]
#[command(name = "slack-dify-relay")]
#[command(about = "Relay Slack app mentions to a Dify chat app")]
#[command(version)]
struct Args {
    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    json_logs: bool,

    /// Environment file loaded before reading configuration
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Seconds to wait for in-flight replies on shutdown
    #[arg(long, default_value_t = 10)]
    shutdown_grace_secs: u64,
}

fn setup_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Resolves once Ctrl+C or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

async fn run(config: RelayConfig, shutdown_grace: Duration) -> anyhow::Result<()> {
    info!("Slack configuration: {:?}", SlackConfigMetadata::from(&config.slack));
    info!("Dify endpoint: {}", config.dify.chat_messages_url());

    let dify = DifyClient::new(config.dify).context("Failed to create Dify client")?;
    let relay = MentionRelay::new(dify, Arc::new(InMemoryConversationStore::new()));

    let options = BotOptions {
        shutdown_grace,
        ..BotOptions::default()
    };
    let bot = Arc::new(
        RelaySlackBot::with_options(config.slack, options)
            .await
            .context("Failed to create Slack bot")?,
    );
    bot.set_event_handler(relay).await;

    let signal_bot = Arc::clone(&bot);
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_bot.shutdown();
    });

    bot.start().await.context("Slack bot stopped with an error")?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Loaded before logging so RUST_LOG from the file applies
    let env_file_result = dotenvy::from_path(&args.env_file);

    setup_logging(&args.log_level, args.json_logs);

    match env_file_result {
        Ok(()) => info!("Loaded environment from {}", args.env_file.display()),
        Err(e) if e.not_found() => {}
        Err(e) => {
            error!("Failed to read {}: {}", args.env_file.display(), e);
            return ExitCode::FAILURE;
        }
    }

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config from environment: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Starting Slack to Dify relay");

    if let Err(e) = run(config, Duration::from_secs(args.shutdown_grace_secs)).await {
        error!("Relay error: {:#}", e);
        return ExitCode::FAILURE;
    }

    info!("Relay stopped");
    ExitCode::SUCCESS
}
