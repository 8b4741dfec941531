//! Publish Route
//!
//! - POST /publish - Fan a message out to a channel and record it
//!
//! Live delivery and storage are independent: both are attempted on every
//! valid request and neither is rolled back when the other fails.

use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        Query, State,
    },
    http::Method,
    Form, Json,
};
use std::sync::Arc;

use crate::api::dto::{PublishForm, PublishResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// POST /publish
///
/// Fields `channel` and `message`, both required and non-empty. Body fields
/// win; the query string fills whatever the body leaves out.
pub async fn publish(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PublishForm>, QueryRejection>,
    form: Result<Form<PublishForm>, FormRejection>,
) -> ApiResult<Json<PublishResponse>> {
    let query = query.map(|Query(query)| query).unwrap_or_default();
    let form = match form {
        Ok(Form(form)) => form,
        Err(_) if !query.is_empty() => PublishForm::default(),
        Err(e) => return Err(ApiError::Validation(e.body_text())),
    };
    let (channel, message) = validate_publish_form(form.or(query))?;

    let published = state.broker.publish(&channel, &message);
    let stored = state.store.append(&channel, &message).await;

    match (published, stored) {
        (Ok(receipt), Ok(id)) => {
            tracing::debug!(
                channel = %channel,
                message_id = id,
                delivered = receipt.delivered,
                dropped = receipt.dropped,
                "Message published"
            );

            Ok(Json(PublishResponse {
                status: "ok".to_string(),
                channel,
                message,
                id,
                delivered: receipt.delivered,
            }))
        }
        (Err(e), stored) => {
            if let Err(storage_err) = stored {
                tracing::warn!(channel = %channel, error = %storage_err, "Message not recorded");
            }
            Err(e.into())
        }
        (Ok(receipt), Err(e)) => {
            tracing::warn!(
                channel = %channel,
                delivered = receipt.delivered,
                "Message delivered but not recorded"
            );
            Err(e.into())
        }
    }
}

/// Any method other than POST on /publish
pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(format!("{method} /publish, use POST"))
}

/// Validate a publish form, returning `(channel, message)`
fn validate_publish_form(form: PublishForm) -> ApiResult<(String, String)> {
    match (form.channel, form.message) {
        (Some(channel), Some(message)) if !channel.is_empty() && !message.is_empty() => {
            Ok((channel, message))
        }
        _ => Err(ApiError::Validation(
            "Channel and message are required".to_string(),
        )),
    }
}
