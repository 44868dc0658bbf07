//! Job repository seam.

use async_trait::async_trait;
use docflow_models::{Job, JobId, JobOutcome, NewJob};

use crate::error::DbResult;

/// Persistent store for jobs.
///
/// `complete` and `fail` are the only writes after creation. Each succeeds at
/// most once per job; a second terminal write returns
/// [`DbError::AlreadyTerminal`](crate::DbError::AlreadyTerminal).
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a pending job and return it with its assigned id.
    async fn create(&self, job: NewJob) -> DbResult<Job>;

    async fn get(&self, id: JobId) -> DbResult<Option<Job>>;

    /// All jobs, most recent first (ties broken by id, descending).
    async fn list(&self) -> DbResult<Vec<Job>>;

    async fn complete(&self, id: JobId, output_path: &str) -> DbResult<Job>;

    async fn fail(&self, id: JobId, message: &str) -> DbResult<Job>;

    /// Jobs still in the pending state, oldest first.
    async fn list_pending(&self) -> DbResult<Vec<Job>>;

    /// Cheap connectivity probe for readiness checks.
    async fn ping(&self) -> DbResult<()>;

    /// Apply a terminal outcome.
    async fn finish(&self, id: JobId, outcome: &JobOutcome) -> DbResult<Job> {
        match outcome {
            JobOutcome::Complete { output_path } => self.complete(id, output_path).await,
            JobOutcome::Error { message } => self.fail(id, message).await,
        }
    }
}
