//! History Route
//!
//! - GET /history?channel=<name>&limit=<n> - Recently published messages

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{HistoryQuery, HistoryResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 1000;

/// GET /history
///
/// Newest first. `limit` defaults to 50 and is clamped to 1..=1000.
pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let channel = query
        .channel
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::Validation("Channel is required".to_string()))?;

    let limit = effective_limit(query.limit);
    let messages = state.store.recent(&channel, limit).await?;

    Ok(Json(HistoryResponse { channel, messages }))
}

fn effective_limit(requested: Option<usize>) -> usize {
    requested.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}
