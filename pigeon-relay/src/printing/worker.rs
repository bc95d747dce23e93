//! Print Worker
//!
//! The only consumer of the job queue and the only user of the printer.
//! Each job walks `Rendering → Printing → Cleanup → Idle`; every failure
//! is typed, logged with the job's sender and kind, and the worker moves
//! on to the next job.

use super::error::{CleanupWarning, RenderError};
use super::queue::JobReceiver;
use super::renderer::Renderer;
use super::types::Job;
use image::RgbImage;
use pigeon_printer::{PrintError, PrintSummary, PrinterDriver, print_bitmap};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Where a job is in its walk through the pipeline
pub enum WorkerState {
    /// Waiting for the next job
    Idle,
    Rendering,
    /// Holds the bitmap produced by rendering
    Printing(RgbImage),
    Cleanup,
}

impl WorkerState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkerState::Idle => "idle",
            WorkerState::Rendering => "rendering",
            WorkerState::Printing(_) => "printing",
            WorkerState::Cleanup => "cleanup",
        }
    }
}

/// Outcome of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job_id: Uuid,
    pub rendered: bool,
    /// Heights of the device pages, `None` unless printing succeeded
    pub printed_pages: Option<Vec<u32>>,
    /// The job's artifact is gone, or it never had one
    pub cleaned: bool,
}

impl JobReport {
    fn new(job_id: Uuid) -> Self {
        Self {
            job_id,
            rendered: false,
            printed_pages: None,
            cleaned: false,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.rendered && self.printed_pages.is_some() && self.cleaned
    }
}

/// Render, print and clean up a single job
pub struct JobPipeline {
    renderer: Renderer,
    driver: Arc<dyn PrinterDriver>,
}

impl JobPipeline {
    pub fn new(renderer: Renderer, driver: Arc<dyn PrinterDriver>) -> Self {
        Self { renderer, driver }
    }

    pub fn render(&self, job: &Job) -> Result<RgbImage, RenderError> {
        self.renderer.render(job)
    }

    pub fn print(&self, job: &Job, bitmap: &RgbImage) -> Result<PrintSummary, PrintError> {
        print_bitmap(self.driver.as_ref(), &job.document_name(), bitmap)
    }

    /// Remove the job's artifact. `Ok(false)` when it had none.
    pub fn cleanup(&self, job: &Job) -> Result<bool, CleanupWarning> {
        let Some(path) = job.artifact() else {
            return Ok(false);
        };
        std::fs::remove_file(path).map_err(|source| CleanupWarning {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(true)
    }

    /// Run one job to completion. Never fails and never panics on bad
    /// input; the report tells what happened.
    pub fn process(&self, job: Job) -> JobReport {
        let span = tracing::info_span!(
            "job",
            job_id = %job.id,
            sender = %job.sender(),
            kind = %job.kind()
        );
        let _enter = span.enter();

        let mut report = JobReport::new(job.id);
        let mut state = WorkerState::Rendering;

        loop {
            tracing::trace!(state = state.name(), "Job state");
            state = match state {
                WorkerState::Idle => break,

                WorkerState::Rendering => match self.render(&job) {
                    Ok(bitmap) => {
                        report.rendered = true;
                        WorkerState::Printing(bitmap)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Render failed, job dropped");
                        if let Some(path) = job.artifact() {
                            tracing::warn!(
                                path = %path.display(),
                                "Upload left in spool until next start"
                            );
                        }
                        WorkerState::Idle
                    }
                },

                WorkerState::Printing(bitmap) => {
                    match self.print(&job, &bitmap) {
                        Ok(summary) => {
                            tracing::info!(pages = summary.page_count(), "Job printed");
                            report.printed_pages = Some(summary.pages);
                        }
                        Err(e) => tracing::error!(error = %e, "Print failed, job dropped"),
                    }
                    WorkerState::Cleanup
                }

                WorkerState::Cleanup => {
                    match self.cleanup(&job) {
                        Ok(removed) => {
                            report.cleaned = true;
                            if removed {
                                tracing::debug!("Artifact removed");
                            }
                        }
                        Err(warning) => tracing::warn!(error = %warning, "Cleanup failed"),
                    }
                    WorkerState::Idle
                }
            };
        }

        report
    }
}

/// Long-running consumer task
pub struct PrintWorker {
    pipeline: Arc<JobPipeline>,
    reports: Option<mpsc::UnboundedSender<JobReport>>,
}

impl PrintWorker {
    pub fn new(pipeline: JobPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            reports: None,
        }
    }

    /// Publish a report after every job
    pub fn with_reports(mut self, reports: mpsc::UnboundedSender<JobReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// Process jobs until shutdown or until every producer is gone.
    ///
    /// Jobs run one at a time on the blocking pool; a job in flight is
    /// always finished before shutdown is observed.
    pub async fn run(self, mut rx: JobReceiver, shutdown: CancellationToken) {
        tracing::info!(printer = self.pipeline.driver.name(), "Print worker started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(pending = rx.len(), "Print worker received shutdown signal");
                    break;
                }
                job = rx.dequeue() => {
                    let Some(job) = job else {
                        tracing::info!("Job queue closed, print worker stopping");
                        break;
                    };
                    self.handle(job).await;
                }
            }
        }
    }

    async fn handle(&self, job: Job) {
        let job_id = job.id;
        let pipeline = self.pipeline.clone();

        match tokio::task::spawn_blocking(move || pipeline.process(job)).await {
            Ok(report) => {
                if let Some(reports) = &self.reports {
                    let _ = reports.send(report);
                }
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Print job panicked, continuing");
            }
        }
    }
}
