//! Persistence sink trait

use async_trait::async_trait;

use super::error::StorageResult;
use super::types::StoredMessage;

/// Append-only message history consumed by the publish path
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Record a message, returning its assigned id
    async fn append(&self, channel: &str, content: &str) -> StorageResult<i64>;

    /// Most recent messages of a channel, newest first
    async fn recent(&self, channel: &str, limit: usize) -> StorageResult<Vec<StoredMessage>>;

    /// Cheap round-trip used by readiness checks
    async fn ping(&self) -> StorageResult<()>;
}
