use pigeon_printer::PrintError;
use thiserror::Error;

/// Startup and serving failures. These end the process.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Printer setup failed: {0}")]
    Printer(#[from] PrintError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
