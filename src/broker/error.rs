//! Broker error types

use thiserror::Error;

/// Errors that can occur in the broker
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The broker has been shut down
    #[error("Broker is closed")]
    Closed,

    /// Subscriber limit reached
    #[error("Too many subscribers (limit: {0})")]
    TooManySubscribers(usize),

    /// A thread panicked while holding the registry lock
    #[error("Broker registry lock poisoned")]
    Poisoned,
}
