//! Error types for external tool invocations.

use std::path::PathBuf;

use thiserror::Error;

use crate::command::ToolKind;

/// Result type for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors that can occur while running an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{tool} tool not found: {program}")]
    NotFound { tool: ToolKind, program: String },

    #[error("failed to start {tool} tool: {source}")]
    Spawn {
        tool: ToolKind,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} tool exited with error: {stderr}")]
    Failed {
        tool: ToolKind,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} tool timed out after {secs} seconds")]
    TimedOut { tool: ToolKind, secs: u64 },

    #[error("{tool} tool reported success but produced no output at {}", path.display())]
    MissingOutput { tool: ToolKind, path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Create a tool failure error.
    pub fn failed(tool: ToolKind, exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::Failed {
            tool,
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Create a missing binary error.
    pub fn not_found(tool: ToolKind, program: impl Into<String>) -> Self {
        Self::NotFound {
            tool,
            program: program.into(),
        }
    }

    /// Which tool produced this error, when known.
    pub fn tool(&self) -> Option<ToolKind> {
        match self {
            ToolError::NotFound { tool, .. }
            | ToolError::Spawn { tool, .. }
            | ToolError::Failed { tool, .. }
            | ToolError::TimedOut { tool, .. }
            | ToolError::MissingOutput { tool, .. } => Some(*tool),
            ToolError::Io(_) => None,
        }
    }
}
