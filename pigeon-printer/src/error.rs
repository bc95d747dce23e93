//! Error types for the printer library

use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Network connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// IO error during printing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Printer is offline or unreachable
    #[error("Printer offline: {0}")]
    Offline(String),

    /// Timeout waiting for printer
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The device rejected one step of the document protocol
    #[error("Device fault during {op}: {message}")]
    Device { op: &'static str, message: String },

    /// Raster band could not be encoded
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Driver-level failure (printer lookup, spooler, handles)
    #[error("Driver error: {0}")]
    Driver(String),
}

impl PrintError {
    /// Shorthand for a fault raised by one device call
    pub fn device(op: &'static str, message: impl Into<String>) -> Self {
        Self::Device {
            op,
            message: message.into(),
        }
    }
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
