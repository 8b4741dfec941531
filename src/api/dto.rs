//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.

use serde::{Deserialize, Serialize};

use crate::storage::StoredMessage;

// ============================================
// PUBLISH DTOs
// ============================================

/// Fields of `POST /publish`, read from the form body or the query string
///
/// Both fields are optional here so a missing field is reported as a
/// validation error rather than a deserialization failure.
#[derive(Debug, Default, Deserialize)]
pub struct PublishForm {
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl PublishForm {
    /// Fill fields missing here from `fallback`
    pub fn or(self, fallback: PublishForm) -> PublishForm {
        PublishForm {
            channel: self.channel.or(fallback.channel),
            message: self.message.or(fallback.message),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.channel.is_none() && self.message.is_none()
    }
}

/// Successful publish
#[derive(Debug, Serialize, Deserialize)]
pub struct PublishResponse {
    /// Status: "ok"
    pub status: String,
    pub channel: String,
    pub message: String,
    /// History id of the stored copy
    pub id: i64,
    /// Sessions the message was queued for
    pub delivered: usize,
}

// ============================================
// HISTORY DTOs
// ============================================

/// Query string of `GET /history`
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Recent messages of a channel, newest first
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub channel: String,
    pub messages: Vec<StoredMessage>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health status
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy", "degraded" or "unhealthy"
    pub status: String,
    pub storage: String,
    pub broker: String,
    /// Channels with at least one subscriber
    pub channels: usize,
    /// Connected subscriber sessions
    pub subscribers: usize,
    pub uptime_seconds: u64,
    pub version: String,
}
