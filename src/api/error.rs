//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or empty required input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Wrong HTTP method for the endpoint
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Broker rejected the publish or subscription
    #[error("Broker error: {0}")]
    Broker(#[from] crate::broker::BrokerError),

    /// Message history could not be written or read
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    /// WebSocket upgrade failed
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// HTTP status and machine-readable code for this error
    pub fn status_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::MethodNotAllowed(_) => (StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED"),
            ApiError::Broker(_) => (StatusCode::INTERNAL_SERVER_ERROR, "BROKER_ERROR"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            ApiError::Connection(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONNECTION_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "API error occurred"
            );
        } else {
            tracing::debug!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "Request rejected"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::BrokerError;
    use crate::storage::StorageError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::MethodNotAllowed("GET".into()), StatusCode::METHOD_NOT_ALLOWED),
            (ApiError::Broker(BrokerError::Closed), StatusCode::INTERNAL_SERVER_ERROR),
            (
                ApiError::Storage(StorageError::Lock("poisoned".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::Connection("no upgrade".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status_code().0, expected, "{error}");
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
