//! Job definitions.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{JobStatus, ProcessingOptions};

/// Unique, monotonically assigned job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl JobId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for JobId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(JobId)
    }
}

/// Data needed to create a job. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    /// Storage-relative path of the uploaded source file
    pub input_path: String,
    /// Requested transformations
    pub options: ProcessingOptions,
}

impl NewJob {
    pub fn new(input_path: impl Into<String>, options: ProcessingOptions) -> Self {
        Self {
            input_path: input_path.into(),
            options,
        }
    }
}

/// Terminal result of processing a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Artifact available at a storage-relative path
    Complete { output_path: String },
    /// Processing failed with a diagnostic message
    Error { message: String },
}

impl JobOutcome {
    pub fn complete(output_path: impl Into<String>) -> Self {
        Self::Complete {
            output_path: output_path.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Status this outcome moves the job to.
    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Complete { .. } => JobStatus::Complete,
            JobOutcome::Error { .. } => JobStatus::Error,
        }
    }
}

/// Attempted to move a job that already reached a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("job {job_id} is already {status}")]
pub struct InvalidTransition {
    pub job_id: JobId,
    pub status: JobStatus,
}

/// One processing request and its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Storage-relative path of the source file
    pub input_path: String,

    /// Storage-relative path of the artifact, set iff complete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,

    /// Requested transformations
    pub options: ProcessingOptions,

    /// Current status
    #[serde(default)]
    pub status: JobStatus,

    /// Diagnostic text, set iff status is error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Build a pending job as the store would on creation.
    pub fn pending(id: JobId, new_job: NewJob, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            input_path: new_job.input_path,
            output_path: None,
            options: new_job.options,
            status: JobStatus::Pending,
            error_message: None,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply the one terminal transition.
    pub fn finish(mut self, outcome: JobOutcome) -> Result<Self, InvalidTransition> {
        if self.is_terminal() {
            return Err(InvalidTransition {
                job_id: self.id,
                status: self.status,
            });
        }

        match outcome {
            JobOutcome::Complete { output_path } => {
                self.status = JobStatus::Complete;
                self.output_path = Some(output_path);
            }
            JobOutcome::Error { message } => {
                self.status = JobStatus::Error;
                self.error_message = Some(message);
            }
        }
        self.updated_at = Utc::now();
        Ok(self)
    }

    /// Artifact path when the job completed.
    pub fn artifact_path(&self) -> Option<&str> {
        match self.status {
            JobStatus::Complete => self.output_path.as_deref(),
            _ => None,
        }
    }

    /// File name shown in listings: the artifact if any, else the input.
    pub fn display_file_name(&self) -> String {
        let path = self.output_path.as_deref().unwrap_or(&self.input_path);
        base_name(path)
    }

    /// Name shown to the user: the requested name, else the input file name.
    pub fn display_output_name(&self) -> String {
        match self.options.output_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => base_name(&self.input_path),
        }
    }
}

fn base_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
