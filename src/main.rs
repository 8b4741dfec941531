//! Relay server
//!
//! Run with: cargo run -- serve
//!
//! # Configuration
//!
//! Read from `--config PATH`, else the first of
//! `~/.config/relay/config.toml`, `/etc/relay/config.toml`, `./config.toml`.
//! Environment variables override file values:
//! - `RELAY_HOST` / `RELAY_PORT`: Listen address (default: 0.0.0.0:8080)
//! - `RELAY_DATABASE`: Message history file
//! - `RELAY_SUBSCRIBER_BUFFER`: Per-subscriber queue size
//! - `RELAY_LOG_LEVEL` / `RELAY_LOG_FORMAT`: Logging
//! - `RUST_LOG`: Full tracing filter, takes precedence over the level

use anyhow::Context;
use clap::{Parser, Subcommand};
use relay::config::{generate_default_config, Config, LoggingConfig};
use relay::lifecycle::{shutdown_signal, Lifecycle};
use relay::storage::{MessageSink, SqliteMessageStore};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "relay")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Publish messages over HTTP, fan them out over WebSocket")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the relay server (default)
    Serve {
        /// Override the listen host
        #[arg(long)]
        host: Option<String>,
        /// Override the listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print recent messages of a channel from the history database
    History {
        /// Channel name
        channel: String,
        /// Number of messages
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Print a default config file
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            init_logging(&config.logging);
            serve(config).await
        }
        Commands::History { channel, limit } => history(&config, &channel, limit).await,
        Commands::Config => {
            print!("{}", generate_default_config());
            Ok(())
        }
    }
}

/// Initialize tracing from the logging config
fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("relay={},tower_http=info", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting relay v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Message history: {}", config.storage.database_path);

    let server = Lifecycle::start(&config)
        .await
        .context("failed to start relay")?;
    server.run(shutdown_signal()).await?;

    tracing::info!("Relay stopped");
    Ok(())
}

async fn history(config: &Config, channel: &str, limit: usize) -> anyhow::Result<()> {
    let store = SqliteMessageStore::open(&config.storage.database_path)
        .with_context(|| format!("failed to open {}", config.storage.database_path))?;

    let mut messages = store.recent(channel, limit).await?;
    if messages.is_empty() {
        println!("No messages in '{}'", channel);
        return Ok(());
    }

    // Oldest first reads naturally in a terminal
    messages.reverse();
    for msg in messages {
        println!(
            "#{:<6} {}  [{}] {}",
            msg.id,
            msg.created_at.format("%Y-%m-%d %H:%M:%S"),
            msg.channel,
            msg.content
        );
    }

    Ok(())
}
