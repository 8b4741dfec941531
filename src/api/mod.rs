//! Relay HTTP API
//!
//! HTTP and WebSocket surface, built with Axum.
//!
//! # Endpoints
//!
//! ## Relay
//! - `POST /publish` - Publish a message (form fields `channel`, `message`)
//! - `GET /subscribe?channel=..` - WebSocket stream of one or more channels
//!
//! ## History
//! - `GET /history?channel=..&limit=..` - Recently published messages
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use relay::api::{build_router, AppState};
//! use relay::broker::Broker;
//! use relay::storage::SqliteMessageStore;
//! use std::sync::Arc;
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let state = AppState::new(
//!     Arc::new(Broker::default()),
//!     Arc::new(SqliteMessageStore::open("./relay.db")?),
//!     shutdown_rx,
//! );
//! let router = build_router(state);
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    Router::new()
        .route(
            "/publish",
            post(routes::publish::publish).fallback(routes::publish::method_not_allowed),
        )
        .route("/subscribe", get(routes::subscribe::subscribe))
        .route("/history", get(routes::history::history))
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
