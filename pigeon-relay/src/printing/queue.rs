//! Job queue
//!
//! Unbounded FIFO between many producers and the single print worker.
//! Producers hold clones of [`JobQueue`]; the worker owns the one
//! [`JobReceiver`]. Dropping every producer closes the queue.

use super::types::Job;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// Create a connected producer/consumer pair
pub fn job_queue() -> (JobQueue, JobReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let pending = Arc::new(AtomicUsize::new(0));
    (
        JobQueue {
            tx,
            pending: pending.clone(),
        },
        JobReceiver { rx, pending },
    )
}

/// Producer handle
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<Job>,
    pending: Arc<AtomicUsize>,
}

impl JobQueue {
    /// Append a job; never blocks.
    ///
    /// Returns the 1-based position the job takes among jobs not yet picked
    /// up by the worker. Concurrent submissions may make it slightly stale.
    pub fn enqueue(&self, job: Job) -> usize {
        let position = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        let job_id = job.id;
        if self.tx.send(job).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            tracing::error!(job_id = %job_id, "Print worker is gone, job dropped");
        }
        position
    }

    /// Jobs waiting to be picked up
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Consumer handle, owned by the print worker
#[derive(Debug)]
pub struct JobReceiver {
    rx: mpsc::UnboundedReceiver<Job>,
    pending: Arc<AtomicUsize>,
}

impl JobReceiver {
    /// Wait for the next job in submission order.
    ///
    /// Returns `None` once every producer is dropped and the queue is drained.
    pub async fn dequeue(&mut self) -> Option<Job> {
        let job = self.rx.recv().await?;
        self.pending.fetch_sub(1, Ordering::SeqCst);
        Some(job)
    }

    /// Take a job if one is already waiting
    pub fn try_dequeue(&mut self) -> Option<Job> {
        let job = self.rx.try_recv().ok()?;
        self.pending.fetch_sub(1, Ordering::SeqCst);
        Some(job)
    }

    pub fn len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printing::types::JobPayload;

    fn text_job(text: &str) -> Job {
        Job::text(text, None)
    }

    fn payload(job: &Job) -> String {
        match &job.payload {
            JobPayload::Text(t) => t.clone(),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_positions_count_waiting_jobs() {
        let (queue, mut rx) = job_queue();
        assert_eq!(queue.enqueue(text_job("a")), 1);
        assert_eq!(queue.enqueue(text_job("b")), 2);
        assert_eq!(queue.len(), 2);

        rx.try_dequeue().unwrap();
        assert_eq!(queue.enqueue(text_job("c")), 2);
        assert_eq!(rx.len(), 2);
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let (queue, mut rx) = job_queue();
        for name in ["j1", "j2", "j3"] {
            queue.enqueue(text_job(name));
        }

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(payload(&rx.dequeue().await.unwrap()));
        }
        assert_eq!(seen, vec!["j1", "j2", "j3"]);
        assert!(rx.is_empty());
    }

    #[tokio::test]
    async fn test_fifo_across_producer_tasks() {
        let (queue, mut rx) = job_queue();

        // Each producer submits after the previous one finished, with jitter
        for i in 0..10u64 {
            let producer = queue.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(i % 3)).await;
                producer.enqueue(text_job(&format!("job-{}", i)));
            })
            .await
            .unwrap();
        }

        for i in 0..10 {
            let job = rx.dequeue().await.unwrap();
            assert_eq!(payload(&job), format!("job-{}", i));
        }
    }

    #[tokio::test]
    async fn test_dequeue_waits_for_producer() {
        let (queue, mut rx) = job_queue();
        let consumer = tokio::spawn(async move { rx.dequeue().await.map(|j| payload(&j)) });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        queue.enqueue(text_job("late"));

        assert_eq!(consumer.await.unwrap().as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn test_closed_when_producers_dropped() {
        let (queue, mut rx) = job_queue();
        queue.enqueue(text_job("last"));
        drop(queue);

        assert!(rx.dequeue().await.is_some());
        assert!(rx.dequeue().await.is_none());
    }
}
