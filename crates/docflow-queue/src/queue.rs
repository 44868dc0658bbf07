//! Unbounded in-process job queue.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use docflow_models::JobId;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{QueueError, QueueResult};

/// A job handed to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    pub job_id: JobId,
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedJob {
    /// Time spent waiting in the queue so far.
    pub fn waited(&self) -> std::time::Duration {
        (Utc::now() - self.enqueued_at).to_std().unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct Shared {
    depth: AtomicUsize,
    seen: Mutex<HashSet<JobId>>,
}

/// Create a connected queue and receiver.
pub fn channel() -> (JobQueue, JobReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared::default());
    (
        JobQueue {
            tx,
            shared: shared.clone(),
        },
        JobReceiver { rx, shared },
    )
}

/// Sending half. Cheap to clone.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<QueuedJob>,
    shared: Arc<Shared>,
}

impl JobQueue {
    /// Enqueue a job id.
    ///
    /// Never blocks. A job id is accepted at most once while it is waiting;
    /// receiving it releases the id.
    pub fn enqueue(&self, job_id: JobId) -> QueueResult<()> {
        {
            let mut seen = self
                .shared
                .seen
                .lock()
                .map_err(|_| QueueError::enqueue_failed("queue state poisoned"))?;
            if !seen.insert(job_id) {
                return Err(QueueError::Duplicate(job_id));
            }
        }

        let job = QueuedJob {
            job_id,
            enqueued_at: Utc::now(),
        };

        let depth = self.shared.depth.fetch_add(1, Ordering::SeqCst) + 1;
        if self.tx.send(job).is_err() {
            self.shared.depth.fetch_sub(1, Ordering::SeqCst);
            if let Ok(mut seen) = self.shared.seen.lock() {
                seen.remove(&job_id);
            }
            return Err(QueueError::Closed);
        }

        metrics::gauge!("docflow_queue_depth").set(depth as f64);
        debug!(job_id = %job_id, depth, "Enqueued job");
        Ok(())
    }

    /// Jobs enqueued but not yet received.
    pub fn depth(&self) -> usize {
        self.shared.depth.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half, owned by the executor.
#[derive(Debug)]
pub struct JobReceiver {
    rx: mpsc::UnboundedReceiver<QueuedJob>,
    shared: Arc<Shared>,
}

impl JobReceiver {
    /// Wait for the next job. Returns `None` once closed and drained.
    pub async fn recv(&mut self) -> Option<QueuedJob> {
        let job = self.rx.recv().await?;
        if let Ok(mut seen) = self.shared.seen.lock() {
            seen.remove(&job.job_id);
        }
        let depth = self
            .shared
            .depth
            .fetch_sub(1, Ordering::SeqCst)
            .saturating_sub(1);
        metrics::gauge!("docflow_queue_depth").set(depth as f64);
        Some(job)
    }

    /// Stop accepting new jobs. Already queued jobs can still be received.
    pub fn close(&mut self) {
        info!("Closing job queue");
        self.rx.close();
    }
}
