//! Job submission
//!
//! Producer side of the pipeline. Validates a request, stamps it with the
//! sender and the current time and appends it to the queue. The returned
//! position is what the front end reports back to the user.

use super::error::SubmitError;
use super::queue::JobQueue;
use super::types::{ImageSource, Job, Provenance, Sender};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const UPLOAD_PREFIX: &str = "upload-";
const UPLOAD_SUFFIX: &str = ".img";

/// Remove uploads left in `spool_dir` by an earlier run.
///
/// Call before the queue exists: every upload found then is orphaned.
/// Returns how many files were removed. A missing directory counts as empty.
pub fn sweep_spool(spool_dir: &Path) -> usize {
    let entries = match std::fs::read_dir(spool_dir) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !(name.starts_with(UPLOAD_PREFIX) && name.ends_with(UPLOAD_SUFFIX)) {
            continue;
        }
        match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %entry.path().display(), error = %e, "Stale upload not removed"),
        }
    }

    if removed > 0 {
        info!(removed, dir = %spool_dir.display(), "Stale uploads removed");
    }
    removed
}

/// Cloneable submission handle
#[derive(Debug, Clone)]
pub struct Submitter {
    queue: JobQueue,
    max_text_length: usize,
    spool_dir: PathBuf,
}

impl Submitter {
    /// `spool_dir` receives uploaded images until the worker has printed them
    pub fn new(queue: JobQueue, max_text_length: usize, spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            queue,
            max_text_length,
            spool_dir: spool_dir.into(),
        }
    }

    /// Enqueue a text job
    ///
    /// Length is counted in characters. Text longer than the limit is
    /// refused and the limit is returned in the error.
    pub fn submit_text(&self, sender: &Sender, text: &str) -> Result<usize, SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::EmptyText);
        }
        let length = text.chars().count();
        if length > self.max_text_length {
            warn!(
                sender = %sender.display_name,
                length,
                limit = self.max_text_length,
                "Text submission rejected"
            );
            return Err(SubmitError::TextTooLong {
                length,
                limit: self.max_text_length,
            });
        }

        let job = Job::text(text, Some(Provenance::now(sender)));
        Ok(self.push(job))
    }

    /// Enqueue an image job from uploaded bytes
    ///
    /// The bytes are written to a file in the spool directory; that file
    /// belongs to the job and is removed after printing.
    pub fn submit_image(&self, sender: &Sender, bytes: &[u8]) -> Result<usize, SubmitError> {
        std::fs::create_dir_all(&self.spool_dir)?;

        let mut file = tempfile::Builder::new()
            .prefix(UPLOAD_PREFIX)
            .suffix(UPLOAD_SUFFIX)
            .tempfile_in(&self.spool_dir)?;
        file.write_all(bytes)?;
        let (_, path) = file.keep().map_err(|e| e.error)?;

        let job = Job::image(ImageSource::File(path.clone()), Some(Provenance::now(sender)))
            .with_artifact(path);
        Ok(self.push(job))
    }

    /// Enqueue an image job for a file the caller keeps ownership of
    pub fn submit_image_file(&self, sender: &Sender, path: impl AsRef<Path>) -> usize {
        let job = Job::image(
            ImageSource::File(path.as_ref().to_path_buf()),
            Some(Provenance::now(sender)),
        );
        self.push(job)
    }

    /// Jobs waiting for the worker
    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    fn push(&self, job: Job) -> usize {
        let (job_id, kind, sender) = (job.id, job.kind(), job.sender().to_string());
        let position = self.queue.enqueue(job);
        info!(job_id = %job_id, kind = %kind, sender = %sender, position, "Job queued");
        position
    }
}
