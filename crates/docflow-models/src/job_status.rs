//! Job status as stored and as reported to polling clients.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Persisted job status.
///
/// The stored representation is exactly `In Progress`, `Complete` or `Error`.
/// `Pending` is the only non-terminal state; a job leaves it once and never
/// changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum JobStatus {
    /// Job is waiting for or being handled by the worker
    #[default]
    #[serde(rename = "In Progress")]
    Pending,
    /// Job produced an artifact
    #[serde(rename = "Complete")]
    Complete,
    /// Job failed; see the job's error message
    #[serde(rename = "Error")]
    Error,
}

impl JobStatus {
    /// Get the stored string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "In Progress",
            JobStatus::Complete => "Complete",
            JobStatus::Error => "Error",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }

    /// Normalize for the HTTP boundary.
    pub fn to_api(self) -> ApiJobStatus {
        match self {
            JobStatus::Pending => ApiJobStatus::InProgress,
            JobStatus::Complete => ApiJobStatus::Complete,
            JobStatus::Error => ApiJobStatus::Error,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown job status: {0}")]
pub struct UnknownJobStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownJobStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "In Progress" => Ok(JobStatus::Pending),
            "Complete" => Ok(JobStatus::Complete),
            "Error" => Ok(JobStatus::Error),
            other => Err(UnknownJobStatus(other.to_string())),
        }
    }
}

/// Three-valued status reported by the list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ApiJobStatus {
    InProgress,
    Complete,
    Error,
}

impl ApiJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiJobStatus::InProgress => "in-progress",
            ApiJobStatus::Complete => "complete",
            ApiJobStatus::Error => "error",
        }
    }
}

impl From<JobStatus> for ApiJobStatus {
    fn from(status: JobStatus) -> Self {
        status.to_api()
    }
}
