//! Startup handling of jobs left pending by a previous process.

use tracing::{info, warn};

use docflow_db::{DbError, JobRepository};
use docflow_queue::{JobQueue, QueueError};

use crate::config::StaleJobPolicy;
use crate::error::WorkerResult;
use crate::metrics;

/// Error text recorded on jobs failed by [`StaleJobPolicy::Fail`].
pub const INTERRUPTED_MESSAGE: &str = "Processing was interrupted before completion";

/// What recovery did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    pub found: usize,
    pub requeued: usize,
    pub failed: usize,
}

/// Apply `policy` to every pending job.
///
/// Must run before the API starts accepting requests, otherwise freshly
/// created jobs would be treated as orphans.
pub async fn recover_orphaned_jobs(
    repo: &dyn JobRepository,
    queue: &JobQueue,
    policy: StaleJobPolicy,
) -> WorkerResult<RecoveryReport> {
    let pending = repo.list_pending().await?;
    let mut report = RecoveryReport {
        found: pending.len(),
        ..Default::default()
    };

    if pending.is_empty() {
        return Ok(report);
    }

    match policy {
        StaleJobPolicy::Off => {
            warn!(
                count = pending.len(),
                "Found pending jobs from a previous run; leaving them untouched"
            );
        }
        StaleJobPolicy::Requeue => {
            for job in &pending {
                match queue.enqueue(job.id) {
                    Ok(()) => report.requeued += 1,
                    Err(QueueError::Duplicate(_)) => {}
                    Err(e) => return Err(e.into()),
                }
            }
            metrics::record_jobs_recovered("requeue", report.requeued);
            info!(count = report.requeued, "Requeued orphaned jobs");
        }
        StaleJobPolicy::Fail => {
            for job in &pending {
                match repo.fail(job.id, INTERRUPTED_MESSAGE).await {
                    Ok(_) => report.failed += 1,
                    Err(DbError::AlreadyTerminal { .. }) => {}
                    Err(e) => return Err(e.into()),
                }
            }
            metrics::record_jobs_recovered("fail", report.failed);
            info!(count = report.failed, "Marked orphaned jobs as failed");
        }
    }

    Ok(report)
}
