//! Shared data models for the docflow backend.
//!
//! This crate provides Serde-serializable types for:
//! - Processing jobs and their requested options
//! - Job status, both as persisted and as exposed over HTTP
//! - The processed-files list view used for polling

pub mod job;
pub mod job_status;
pub mod options;
pub mod processed_file;

// Re-export common types
pub use job::{InvalidTransition, Job, JobId, JobOutcome, NewJob};
pub use job_status::{ApiJobStatus, JobStatus, UnknownJobStatus};
pub use options::ProcessingOptions;
pub use processed_file::ProcessedFileEntry;
