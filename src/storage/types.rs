//! Persisted message record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A published message as recorded in history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredMessage {
    /// Auto-incremented identifier
    pub id: i64,
    /// Channel the message was published to
    pub channel: String,
    /// Message body
    pub content: String,
    /// When the record was written
    pub created_at: DateTime<Utc>,
}
