//! HTTP intake
//!
//! Stand-in for a messaging front end: each request is one inbound
//! submission and the response carries the queue position.
//!
//! - [`health`] - liveness and queue depth
//! - [`print`] - text and image submissions

pub mod health;
pub mod print;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

pub use crate::utils::{AppResponse, AppResult};

/// Build the router with state and middleware applied
pub fn build_app(state: ServerState) -> Router {
    let max_image_bytes = state.config.max_image_bytes;

    Router::<ServerState>::new()
        .merge(health::router())
        .merge(print::router(max_image_bytes))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
