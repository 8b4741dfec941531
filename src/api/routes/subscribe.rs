//! Subscribe Route
//!
//! - GET /subscribe?channel=<name>[&channel=<name>...] - WebSocket stream
//!
//! Validation happens before the upgrade so a bad request gets a proper
//! HTTP error instead of a socket that closes immediately.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::broker::ChannelSet;
use crate::session::Session;

/// GET /subscribe
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> ApiResult<Response> {
    let channels = channels_from_query(params).ok_or_else(|| {
        ApiError::Validation("At least one 'channel' parameter is required".to_string())
    })?;

    let ws = ws.map_err(|e| ApiError::Connection(e.body_text()))?;

    let session = Session::new(
        Arc::clone(&state.broker),
        channels,
        state.shutdown.clone(),
    );

    Ok(ws
        .on_failed_upgrade(|e| {
            tracing::warn!(error = %e, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| async move {
            session.run(socket).await;
        }))
}

/// Collect every non-empty `channel` query parameter
fn channels_from_query(params: Vec<(String, String)>) -> Option<ChannelSet> {
    ChannelSet::new(
        params
            .into_iter()
            .filter(|(key, _)| key == "channel")
            .map(|(_, value)| value),
    )
}
