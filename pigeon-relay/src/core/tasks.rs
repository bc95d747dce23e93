//! Background tasks
//!
//! The relay runs two kinds of task next to the HTTP server: the print
//! worker, which watches the shutdown token, and timers such as the log
//! cleanup, which are aborted at shutdown.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Runs until the shutdown token fires
    Worker,
    /// Loops on a timer, aborted at shutdown
    Periodic,
}

struct Spawned {
    name: &'static str,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// Spawns tasks, contains their panics and stops them together
///
/// ```ignore
/// let mut tasks = BackgroundTasks::new();
/// let token = tasks.shutdown_token();
/// tasks.spawn("print_worker", TaskKind::Worker, worker.run(rx, token));
/// // ...
/// tasks.shutdown().await;
/// ```
pub struct BackgroundTasks {
    spawned: Vec<Spawned>,
    token: CancellationToken,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    match (payload.downcast_ref::<&str>(), payload.downcast_ref::<String>()) {
        (Some(s), _) => (*s).to_string(),
        (_, Some(s)) => s.clone(),
        _ => "non-string panic payload".to_string(),
    }
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self {
            spawned: Vec::new(),
            token: CancellationToken::new(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawn `future` on the runtime. A panic is logged rather than lost
    /// with the task, and returning before shutdown is reported.
    pub fn spawn<F>(&mut self, name: &'static str, kind: TaskKind, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        let handle = tokio::spawn(async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(()) if token.is_cancelled() => {}
                Ok(()) => tracing::warn!(task = name, ?kind, "Task returned before shutdown"),
                Err(payload) => tracing::error!(
                    task = name,
                    ?kind,
                    panic = %panic_message(payload.as_ref()),
                    "Task panicked"
                ),
            }
        });

        tracing::debug!(task = name, ?kind, "Task spawned");
        self.spawned.push(Spawned { name, kind, handle });
    }

    pub fn len(&self) -> usize {
        self.spawned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty()
    }

    pub fn log_summary(&self) {
        let names: Vec<&str> = self.spawned.iter().map(|t| t.name).collect();
        tracing::info!(count = names.len(), tasks = ?names, "Background tasks running");
    }

    /// Fire the token, abort the timers and wait for everything.
    ///
    /// The print worker finishes its job in flight first.
    pub async fn shutdown(self) {
        tracing::info!(count = self.spawned.len(), "Stopping background tasks");
        self.token.cancel();

        for task in self.spawned {
            if task.kind == TaskKind::Periodic {
                task.handle.abort();
            }
            match task.handle.await {
                Ok(()) => tracing::debug!(task = task.name, "Task stopped"),
                Err(e) if e.is_cancelled() => tracing::debug!(task = task.name, "Task aborted"),
                Err(e) => tracing::error!(task = task.name, error = ?e, "Task failed to join"),
            }
        }

        tracing::info!("Background tasks stopped");
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}
