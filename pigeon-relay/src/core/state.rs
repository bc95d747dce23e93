use std::sync::Arc;

use pigeon_printer::PrinterDriver;

use crate::core::device::build_driver;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result};
use crate::printing::{
    FontHandle, JobPipeline, PrintWorker, Renderer, Submitter, job_queue, sweep_spool,
};
use crate::utils::logger::periodic_cleanup;

/// Shared handler state
///
/// Handlers only ever see the producer side of the queue. The printer
/// driver lives inside the print worker and is not reachable from here.
///
/// | Field | Meaning |
/// |-------|---------|
/// | config | static configuration |
/// | submitter | validates requests and enqueues jobs |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub submitter: Submitter,
}

impl ServerState {
    pub fn new(config: Config, submitter: Submitter) -> Self {
        Self {
            config: Arc::new(config),
            submitter,
        }
    }

    /// Build the print pipeline and start its background tasks.
    ///
    /// Resolves the printer and the font, creates the job queue and
    /// spawns the print worker on `tasks`.
    pub async fn initialize(config: &Config, tasks: &mut BackgroundTasks) -> Result<Self> {
        let driver = build_driver(config).await?;
        Ok(Self::with_driver(config, driver, tasks))
    }

    /// Same as [`ServerState::initialize`] with an already built driver
    pub fn with_driver(
        config: &Config,
        driver: Arc<dyn PrinterDriver>,
        tasks: &mut BackgroundTasks,
    ) -> Self {
        let font = FontHandle::resolve(&config.font_candidates);
        let renderer = Renderer::new(config.printer_width, font)
            .with_max_image_height(config.max_image_height);

        sweep_spool(&config.spool_dir());
        let (queue, rx) = job_queue();
        let worker = PrintWorker::new(JobPipeline::new(renderer, driver));
        let shutdown = tasks.shutdown_token();
        tasks.spawn("print_worker", TaskKind::Worker, worker.run(rx, shutdown));

        if config.log_to_file {
            tasks.spawn(
                "log_cleanup",
                TaskKind::Periodic,
                periodic_cleanup(config.log_dir()),
            );
        }

        let submitter = Submitter::new(queue, config.max_text_length, config.spool_dir());
        Self::new(config.clone(), submitter)
    }

    pub fn queue_depth(&self) -> usize {
        self.submitter.queue_depth()
    }
}
