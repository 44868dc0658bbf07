//! Application state.

use std::sync::Arc;

use docflow_db::JobRepository;
use docflow_queue::JobQueue;
use docflow_storage::FileStorage;
use docflow_tools::ToolConfig;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub repo: Arc<dyn JobRepository>,
    pub storage: FileStorage,
    pub queue: JobQueue,
    pub tools: ToolConfig,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        repo: Arc<dyn JobRepository>,
        storage: FileStorage,
        queue: JobQueue,
        tools: ToolConfig,
    ) -> Self {
        Self {
            config,
            repo,
            storage,
            queue,
            tools,
        }
    }

    /// Public download link for a job.
    pub fn download_url(id: impl std::fmt::Display) -> String {
        format!("/processed-files/{}/download", id)
    }
}
