//! Application State
//!
//! Shared context handed to every handler and session. Built and torn down
//! by [`Lifecycle`](crate::lifecycle::Lifecycle); wrapped in `Arc` by the
//! router.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

use crate::broker::Broker;
use crate::storage::MessageSink;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Channel broker for live fan-out
    pub broker: Arc<Broker>,
    /// Message history sink
    pub store: Arc<dyn MessageSink>,
    /// Flips to `true` when the process starts shutting down
    pub shutdown: watch::Receiver<bool>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        broker: Arc<Broker>,
        store: Arc<dyn MessageSink>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            broker,
            store,
            shutdown,
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}
