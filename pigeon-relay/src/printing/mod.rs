//! Print job pipeline
//!
//! # Modules
//!
//! - [`types`] - Job, payload and provenance
//! - [`queue`] - FIFO between submitters and the worker
//! - [`submit`] - validation and enqueueing
//! - [`font`] - startup font resolution with a built-in fallback
//! - [`renderer`] - text and image rasterization
//! - [`header`] - provenance header compositing
//! - [`worker`] - the single consumer driving the printer
//!
//! # Flow
//!
//! ```text
//! Submitter ──enqueue──▶ JobQueue ──dequeue──▶ PrintWorker
//!                                                │
//!                        Renderer + header ◀─────┤ Rendering
//!                        print_bitmap      ◀─────┤ Printing
//!                        remove artifact   ◀─────┘ Cleanup
//! ```

pub mod error;
pub mod font;
pub mod header;
pub mod queue;
pub mod renderer;
pub mod submit;
pub mod types;
pub mod worker;

pub use error::{CleanupWarning, RenderError, SubmitError};
pub use font::FontHandle;
pub use header::{HeaderStyle, composite_header};
pub use queue::{JobQueue, JobReceiver, job_queue};
pub use renderer::{Renderer, TextStyle};
pub use submit::{Submitter, sweep_spool};
pub use types::{ImageSource, Job, JobKind, JobPayload, Provenance, Sender};
pub use worker::{JobPipeline, JobReport, PrintWorker, WorkerState};
