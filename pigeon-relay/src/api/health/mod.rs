//! Health check
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /api/health | GET | liveness and queue depth |
//!
//! ```json
//! { "status": "ok", "version": "0.1.0", "queue_depth": 2 }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    /// Jobs waiting for the print worker
    queue_depth: usize,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        queue_depth: state.queue_depth(),
    })
}
