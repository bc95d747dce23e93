//! Print submission handlers

use axum::Json;
use axum::extract::{Multipart, State};
use serde::{Deserialize, Serialize};

use crate::core::ServerState;
use crate::printing::Sender;
use crate::utils::{AppError, AppResponse, AppResult, ok_with_message};

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub display_name: String,
    #[serde(default)]
    pub handle: Option<String>,
    pub text: String,
}

/// Acknowledgement returned at enqueue time
#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    /// 1-based position among jobs waiting to print
    pub position: usize,
}

fn sender(display_name: String, handle: Option<String>) -> AppResult<Sender> {
    let display_name = display_name.trim();
    if display_name.is_empty() {
        return Err(AppError::validation("display_name is required"));
    }
    let handle = handle.map(|h| h.trim().trim_start_matches('@').to_string());
    Ok(Sender::new(display_name, handle))
}

fn queued(position: usize) -> Json<AppResponse<QueuedResponse>> {
    ok_with_message(
        QueuedResponse { position },
        format!("Queued at position {}", position),
    )
}

/// POST /api/print/text
pub async fn print_text(
    State(state): State<ServerState>,
    Json(req): Json<TextRequest>,
) -> AppResult<Json<AppResponse<QueuedResponse>>> {
    let sender = sender(req.display_name, req.handle)?;
    let position = state.submitter.submit_text(&sender, &req.text)?;
    Ok(queued(position))
}

/// POST /api/print/image
pub async fn print_image(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> AppResult<Json<AppResponse<QueuedResponse>>> {
    let mut display_name = None;
    let mut handle = None;
    let mut data: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("display_name") => display_name = Some(field.text().await?),
            Some("handle") => handle = Some(field.text().await?),
            Some("file") => data = Some(field.bytes().await?.to_vec()),
            _ => {}
        }
    }

    let sender = sender(display_name.unwrap_or_default(), handle)?;
    let data = data.ok_or_else(|| AppError::validation("No 'file' field found"))?;

    if data.is_empty() {
        return Err(AppError::validation("Empty file provided"));
    }
    let limit = state.config.max_image_bytes;
    if data.len() > limit {
        return Err(AppError::PayloadTooLarge(format!(
            "Image is {} bytes, limit is {}",
            data.len(),
            limit
        )));
    }
    // Cheap sniff only; the worker does the real decode
    if let Err(e) = image::guess_format(&data) {
        return Err(AppError::validation(format!("Unsupported image: {}", e)));
    }

    let position = state.submitter.submit_image(&sender, &data)?;
    Ok(queued(position))
}
