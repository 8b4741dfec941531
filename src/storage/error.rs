//! Storage error types
//!
//! Defines all errors that can occur in the message history layer.

use thiserror::Error;

/// Errors that can occur while recording or reading messages
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQLite operation failed
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking database task was cancelled or panicked
    #[error("Storage task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
