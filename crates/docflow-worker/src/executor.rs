//! Job executor.

use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use docflow_models::{Job, JobId};
use docflow_queue::JobReceiver;

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::processor::{run_job, ProcessingContext};

type JobTaskResult = (JobId, WorkerResult<Option<Job>>);

/// Signals a running [`JobExecutor`] to stop.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// Consumes the job queue and runs jobs with bounded concurrency.
pub struct JobExecutor {
    config: WorkerConfig,
    ctx: Arc<ProcessingContext>,
    job_semaphore: Arc<Semaphore>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl JobExecutor {
    pub fn new(config: WorkerConfig, ctx: ProcessingContext) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        let (shutdown, _) = watch::channel(false);

        Self {
            config,
            ctx: Arc::new(ctx),
            job_semaphore,
            shutdown: Arc::new(shutdown),
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown.clone(),
        }
    }

    /// Run until shutdown is signalled or the queue closes.
    ///
    /// In-flight jobs get `shutdown_timeout` to finish; after that they are
    /// aborted, which drops (and kills) any running tool process. Aborted
    /// jobs stay pending.
    pub async fn run(&self, mut receiver: JobReceiver) -> WorkerResult<()> {
        info!(
            "Starting job executor with {} max concurrent jobs",
            self.config.max_concurrent_jobs
        );

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut tasks: JoinSet<JobTaskResult> = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    Self::log_join(joined);
                }
                next = receiver.recv() => match next {
                    Some(queued) => {
                        debug!(
                            job_id = %queued.job_id,
                            waited_ms = queued.waited().as_millis() as u64,
                            "Dequeued job"
                        );
                        self.spawn_job(&mut tasks, queued.job_id);
                    }
                    None => {
                        info!("Job queue closed, stopping executor");
                        break;
                    }
                },
            }
        }

        receiver.close();
        // Jobs still waiting for a slot are dropped and stay pending.
        self.job_semaphore.close();

        if !tasks.is_empty() {
            info!("Waiting for {} in-flight jobs to complete...", tasks.len());
            let drained =
                tokio::time::timeout(self.config.shutdown_timeout, Self::drain(&mut tasks)).await;
            if drained.is_err() {
                warn!(
                    "Shutdown timeout reached, aborting {} in-flight jobs",
                    tasks.len()
                );
                tasks.abort_all();
                Self::drain(&mut tasks).await;
            }
        }

        info!("Job executor stopped");
        Ok(())
    }

    fn spawn_job(&self, tasks: &mut JoinSet<JobTaskResult>, job_id: JobId) {
        let ctx = Arc::clone(&self.ctx);
        let semaphore = Arc::clone(&self.job_semaphore);

        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return (job_id, Ok(None)),
            };
            (job_id, run_job(ctx, job_id).await)
        });
    }

    async fn drain(tasks: &mut JoinSet<JobTaskResult>) {
        while let Some(joined) = tasks.join_next().await {
            Self::log_join(joined);
        }
    }

    fn log_join(joined: Result<JobTaskResult, JoinError>) {
        match joined {
            Ok((job_id, Ok(Some(job)))) => {
                debug!(job_id = %job_id, status = %job.status, "Job finished");
            }
            Ok((job_id, Ok(None))) => {
                debug!(job_id = %job_id, "Job skipped");
            }
            Ok((job_id, Err(e))) => {
                error!(job_id = %job_id, "Job could not be recorded: {}", e);
            }
            Err(e) if e.is_cancelled() => {
                warn!("Job task aborted during shutdown");
            }
            Err(e) => {
                error!("Job task failed: {}", e);
            }
        }
    }
}
