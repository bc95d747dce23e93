//! Pigeon Relay - remote print relay
//!
//! Accepts text and image submissions, queues them and prints them one at
//! a time on a single thermal or label printer, each under a header naming
//! the sender and the submission time.
//!
//! # Layout
//!
//! ```text
//! pigeon-relay/src/
//! ├── core/          # config, state, tasks, driver selection, server
//! ├── printing/      # queue, rasterizer, header, worker
//! ├── api/           # HTTP intake
//! └── utils/         # errors and logging
//! ```

pub mod api;
pub mod core;
pub mod printing;
pub mod utils;

pub use core::{BackgroundTasks, Config, Server, ServerState};
pub use printing::{Job, JobQueue, PrintWorker, Sender, Submitter, job_queue};
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};
pub use utils::{AppError, AppResult};

/// Load `.env`, read the configuration and start logging.
///
/// Creates the work directory. With `LOG_TO_FILE` set, stale log files
/// are removed once here and hourly afterwards.
pub fn setup_environment() -> anyhow::Result<Config> {
    dotenv::dotenv().ok();
    let config = Config::from_env();

    std::fs::create_dir_all(&config.work_dir)?;

    let log_dir = config.log_to_file.then(|| config.log_dir());
    init_logger_with_file(&config.log_level, config.log_json, log_dir.as_deref())?;

    if let Some(log_dir) = &log_dir
        && let Err(e) = cleanup_old_logs(log_dir)
    {
        tracing::warn!(error = %e, "Failed to clean up old logs");
    }

    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
    ____  _
   / __ \(_)___ ____  ____  ____
  / /_/ / / __ `/ _ \/ __ \/ __ \
 / ____/ / /_/ /  __/ /_/ / / / /
/_/   /_/\__, /\___/\____/_/ /_/
        /____/   relay
    "#
    );
}
