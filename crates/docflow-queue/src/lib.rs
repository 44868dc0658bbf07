//! In-process job dispatch.
//!
//! This crate provides:
//! - Fire-and-forget hand-off of job ids from the API to the worker
//! - At-most-once enqueueing per job id
//! - Queue depth for readiness and metrics

pub mod error;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use queue::{channel, JobQueue, JobReceiver, QueuedJob};
