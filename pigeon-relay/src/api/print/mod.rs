//! Print submission routes
//!
//! | Path | Method | Body |
//! |------|--------|------|
//! | /api/print/text | POST | JSON `{display_name, handle?, text}` |
//! | /api/print/image | POST | multipart `display_name`, `handle`, `file` |

mod handler;

use axum::{Router, extract::DefaultBodyLimit, routing::post};

use crate::core::ServerState;

/// Room for the multipart boundaries and text fields around the file
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(max_image_bytes: usize) -> Router<ServerState> {
    Router::new().nest("/api/print", routes(max_image_bytes))
}

fn routes(max_image_bytes: usize) -> Router<ServerState> {
    Router::new()
        .route("/text", post(handler::print_text))
        .route(
            "/image",
            post(handler::print_image)
                .layer(DefaultBodyLimit::max(max_image_bytes + MULTIPART_OVERHEAD)),
        )
}
