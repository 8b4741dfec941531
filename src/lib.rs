//! # Relay
//!
//! Real-time channel relay: producers publish a text message to a named
//! channel over HTTP, every client subscribed to that channel over a
//! WebSocket receives it immediately, and a copy is recorded in SQLite.
//!
//! ## Features
//!
//! - **Fan-out**: per-channel broker with bounded, non-blocking delivery
//! - **Multi-channel sessions**: one WebSocket can follow many channels
//! - **History**: every publish is appended to a durable message log
//! - **Graceful shutdown**: sessions are notified and drained on SIGINT/SIGTERM
//!
//! ## Modules
//!
//! - [`broker`]: Channel registry and fan-out
//! - [`session`]: WebSocket subscription sessions
//! - [`storage`]: Message history
//! - [`api`]: HTTP routes with Axum
//! - [`lifecycle`]: Startup and shutdown orchestration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relay::{Config, Lifecycle};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env();
//!
//!     let server = Lifecycle::start(&config).await?;
//!     server.run(relay::lifecycle::shutdown_signal()).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod broker;
pub mod config;
pub mod lifecycle;
pub mod session;
pub mod storage;

// Re-export top-level types for convenience
pub use broker::{
    Broker, BrokerConfig, BrokerError, ChannelSet, Message, PublishReceipt, SubscriberId,
    Subscription,
};

pub use storage::{MessageSink, SqliteMessageStore, StorageError, StorageResult, StoredMessage};

pub use api::{build_router, ApiError, AppState};

pub use session::{Session, SessionEnd};

pub use lifecycle::{Lifecycle, LifecycleError};

pub use config::{Config, ConfigError, LoggingConfig};
