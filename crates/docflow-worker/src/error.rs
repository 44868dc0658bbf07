//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Input file not found: {0}")]
    InputMissing(String),

    /// Tool failures carry the tool's own diagnostic text.
    #[error(transparent)]
    Tool(#[from] docflow_tools::ToolError),

    #[error("Storage error: {0}")]
    Storage(#[from] docflow_storage::StorageError),

    #[error("Database error: {0}")]
    Db(#[from] docflow_db::DbError),

    #[error("Queue error: {0}")]
    Queue(#[from] docflow_queue::QueueError),

    #[error("Unexpected processing fault: {0}")]
    Fault(String),
}

impl WorkerError {
    pub fn input_missing(path: impl Into<String>) -> Self {
        Self::InputMissing(path.into())
    }

    pub fn fault(msg: impl Into<String>) -> Self {
        Self::Fault(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_tools::{ToolError, ToolKind};

    #[test]
    fn test_tool_error_message_is_preserved() {
        let err: WorkerError = ToolError::failed(ToolKind::Reflow, Some(2), "bad margin value").into();
        assert_eq!(err.to_string(), "reflow tool exited with error: bad margin value");
    }

    #[test]
    fn test_fault_message() {
        assert_eq!(
            WorkerError::fault("index out of bounds").to_string(),
            "Unexpected processing fault: index out of bounds"
        );
        assert_eq!(
            WorkerError::input_missing("uploads/temp/a.pdf").to_string(),
            "Input file not found: uploads/temp/a.pdf"
        );
    }
}
