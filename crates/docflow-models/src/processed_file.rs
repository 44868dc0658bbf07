//! List view returned to polling clients.

use serde::{Deserialize, Serialize};

use crate::{ApiJobStatus, Job};

/// One row of `GET /processed-files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedFileEntry {
    pub id: String,
    pub filename: String,
    #[serde(rename = "outputname", skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
    /// ISO-8601 creation timestamp
    pub date_created: String,
    pub status: ApiJobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl ProcessedFileEntry {
    /// Build the entry for a job. `download_url` is only kept when the job
    /// has an artifact.
    pub fn from_job(job: &Job, download_url: impl FnOnce(&Job) -> String) -> Self {
        let download_url = job.artifact_path().map(|_| download_url(job));

        Self {
            id: job.id.to_string(),
            filename: job.display_file_name(),
            output_name: Some(job.display_output_name()),
            date_created: job.created_at.to_rfc3339(),
            status: job.status.to_api(),
            error_message: job.error_message.clone(),
            download_url,
        }
    }
}
