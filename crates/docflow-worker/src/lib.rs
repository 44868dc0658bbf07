//! Document processing worker.
//!
//! This crate provides:
//! - Pipeline planning and execution for a single job
//! - Fault containment so every claimed job reaches a terminal state
//! - Job executor with bounded concurrency and graceful shutdown
//! - Startup recovery for jobs orphaned by a previous process

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod processor;
pub mod recovery;
pub mod retry;

pub use config::{StaleJobPolicy, WorkerConfig};
pub use error::{WorkerError, WorkerResult};
pub use executor::{JobExecutor, ShutdownHandle};
pub use logging::JobLogger;
pub use pipeline::{PipelinePlan, Stage};
pub use processor::{process_job, run_job, ProcessingContext};
pub use recovery::{recover_orphaned_jobs, RecoveryReport};
