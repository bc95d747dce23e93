//! Print job data model

use chrono::{DateTime, Local};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Who submitted a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub display_name: String,
    /// Account handle without the leading `@`
    pub handle: Option<String>,
}

impl Sender {
    pub fn new(display_name: impl Into<String>, handle: Option<String>) -> Self {
        Self {
            display_name: display_name.into(),
            handle: handle.filter(|h| !h.trim().is_empty()),
        }
    }
}

/// Sender identity and submission time, rendered into the job header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub display_name: String,
    pub handle: Option<String>,
    pub submitted_at: DateTime<Local>,
}

impl Provenance {
    /// Stamp a sender with the current local time
    pub fn now(sender: &Sender) -> Self {
        Self {
            display_name: sender.display_name.clone(),
            handle: sender.handle.clone(),
            submitted_at: Local::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Text,
    Image,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Text => write!(f, "text"),
            JobKind::Image => write!(f, "image"),
        }
    }
}

/// Where an image job's bytes live
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Encoded image held in memory
    Bytes(Vec<u8>),
    /// Encoded image on disk
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub enum JobPayload {
    Text(String),
    Image(ImageSource),
}

/// One print request. Immutable once created; dequeued exactly once.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub payload: JobPayload,
    pub provenance: Option<Provenance>,
    /// Temporary file owned by this job, removed after printing
    pub artifact: Option<PathBuf>,
}

impl Job {
    pub fn text(text: impl Into<String>, provenance: Option<Provenance>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload: JobPayload::Text(text.into()),
            provenance,
            artifact: None,
        }
    }

    pub fn image(source: ImageSource, provenance: Option<Provenance>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload: JobPayload::Image(source),
            provenance,
            artifact: None,
        }
    }

    /// Mark a file as owned by this job so the worker deletes it afterwards
    pub fn with_artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact = Some(path.into());
        self
    }

    pub fn kind(&self) -> JobKind {
        match self.payload {
            JobPayload::Text(_) => JobKind::Text,
            JobPayload::Image(_) => JobKind::Image,
        }
    }

    /// Sender display name for logs
    pub fn sender(&self) -> &str {
        self.provenance
            .as_ref()
            .map(|p| p.display_name.as_str())
            .unwrap_or("anonymous")
    }

    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    /// Name of the printer document for this job
    pub fn document_name(&self) -> String {
        format!("Print job {}", self.id.simple())
    }
}
