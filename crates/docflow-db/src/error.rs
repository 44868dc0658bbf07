//! Database error types.

use std::path::PathBuf;

use docflow_models::{JobId, JobStatus};
use thiserror::Error;

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors from database operations.
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLite error from rusqlite.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error when creating the database directory.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration failed to apply.
    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    /// The database lock was poisoned.
    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Job not found: {0}")]
    NotFound(JobId),

    /// A terminal write hit a job that already left the pending state.
    #[error("Job {id} is already terminal ({status})")]
    AlreadyTerminal { id: JobId, status: JobStatus },

    /// A stored row could not be mapped back to a job.
    #[error("Corrupt job row: {0}")]
    Corrupt(String),

    /// The blocking task running the query failed.
    #[error("Database task failed: {0}")]
    Task(String),
}

impl DbError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    /// Whether retrying the same operation could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Sqlite(_) | DbError::Task(_))
    }
}
