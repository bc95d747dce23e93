//! Pipeline error types
//!
//! None of these escape the print worker: each is logged with the job's
//! sender and kind and the worker moves on to the next job.

use std::path::PathBuf;
use thiserror::Error;

/// A payload could not be turned into a bitmap
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Cannot decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Cannot read payload: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("Image {width}x{height} would be {scaled_height}px tall, limit is {limit}")]
    TooLarge {
        width: u32,
        height: u32,
        scaled_height: u64,
        limit: u32,
    },
}

/// A job's temporary file could not be removed
#[derive(Debug, Error)]
#[error("Failed to remove {}: {source}", path.display())]
pub struct CleanupWarning {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// A submission was refused before reaching the queue
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Text is empty")]
    EmptyText,

    #[error("Text too long: {length} characters, limit is {limit}")]
    TextTooLong { length: usize, limit: usize },

    #[error("Failed to spool image: {0}")]
    Spool(#[from] std::io::Error),
}
