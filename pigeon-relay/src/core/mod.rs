//! Core - configuration, shared state, background tasks and the server
//!
//! - [`Config`] - environment configuration
//! - [`ServerState`] - handler state, owns the producer side of the queue
//! - [`Server`] - HTTP intake
//! - [`BackgroundTasks`] - print worker and timers
//! - [`ServerError`] - startup failures

pub mod config;
pub mod device;
pub mod error;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::{Config, PrinterBackend};
pub use device::build_driver;
pub use error::{Result, ServerError};
pub use server::Server;
pub use state::ServerState;
pub use tasks::{BackgroundTasks, TaskKind};
