//! Process Lifecycle
//!
//! Owns startup and coordinated shutdown of the relay:
//!
//! ```text
//! start:    open message store → create broker → bind listener
//! shutdown: stop accepting → notify sessions → drain (bounded) → close broker
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::api::{build_router, AppState};
use crate::broker::{Broker, BrokerConfig, BrokerError};
use crate::config::Config;
use crate::storage::{MessageSink, SqliteMessageStore, StorageError};

/// Errors raised while starting or running the relay
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to open message store: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(std::io::Error),

    #[error("Failed to close broker: {0}")]
    Broker(#[from] BrokerError),
}

/// A started relay, ready to serve
pub struct Lifecycle {
    state: AppState,
    listener: TcpListener,
    shutdown_tx: watch::Sender<bool>,
    grace: Duration,
}

impl Lifecycle {
    /// Open the configured SQLite store and start the relay on it
    pub async fn start(config: &Config) -> Result<Self, LifecycleError> {
        let store = SqliteMessageStore::open(&config.storage.database_path)?;
        Self::with_store(config, Arc::new(store)).await
    }

    /// Start the relay on an already opened message sink
    pub async fn with_store(
        config: &Config,
        store: Arc<dyn MessageSink>,
    ) -> Result<Self, LifecycleError> {
        let broker = Arc::new(Broker::new(BrokerConfig::from(&config.broker)));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = AppState::new(broker, store, shutdown_rx);

        let addr = config.server.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| LifecycleError::Bind {
                addr: addr.clone(),
                source,
            })?;

        Ok(Self {
            state,
            listener,
            shutdown_tx,
            grace: Duration::from_secs(config.server.shutdown_grace_secs),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared context handed to handlers
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until `signal` resolves, then shut down in order
    pub async fn run<F>(self, signal: F) -> Result<(), LifecycleError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Lifecycle {
            state,
            listener,
            shutdown_tx,
            grace,
        } = self;

        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Relay listening on {}", addr);
        }

        let broker = Arc::clone(&state.broker);
        let router = build_router(state);

        let notify = shutdown_tx.clone();
        let shutdown = async move {
            signal.await;
            tracing::info!("Shutdown signal received, starting graceful shutdown");
            let _ = notify.send(true);
        };

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(LifecycleError::Serve)?;

        // Covers a server that stopped on its own
        let _ = shutdown_tx.send(true);

        drain_sessions(&broker, grace).await;
        broker.close()?;

        tracing::info!("Relay shut down gracefully");
        Ok(())
    }
}

/// Wait for subscribed sessions to leave, up to `grace`
async fn drain_sessions(broker: &Broker, grace: Duration) {
    let drained = tokio::time::timeout(grace, async {
        while broker.subscriber_count() > 0 {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await;

    if drained.is_err() {
        tracing::warn!(
            remaining = broker.subscriber_count(),
            "Sessions still open after grace period, closing broker"
        );
    }
}

/// Wait for Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
