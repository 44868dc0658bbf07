//! Tool configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::command::ToolKind;
use crate::error::{ToolError, ToolResult};

/// External tool configuration.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Reflow binary name or path
    pub reflow_bin: String,
    /// Dehyphenation binary name or path
    pub dehyphenate_bin: String,
    /// Threads passed to the reflow tool
    pub reflow_threads: u32,
    /// Wall-clock limit per invocation
    pub timeout: Duration,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            reflow_bin: "k2pdfopt".to_string(),
            dehyphenate_bin: "ebook-modify".to_string(),
            reflow_threads: 8,
            timeout: Duration::from_secs(900),
        }
    }
}

impl ToolConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            reflow_bin: std::env::var("REFLOW_BIN").unwrap_or(defaults.reflow_bin),
            dehyphenate_bin: std::env::var("DEHYPHENATE_BIN").unwrap_or(defaults.dehyphenate_bin),
            reflow_threads: std::env::var("REFLOW_THREADS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.reflow_threads),
            timeout: Duration::from_secs(
                std::env::var("TOOL_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(900),
            ),
        }
    }

    /// Configured program for a tool.
    pub fn program(&self, tool: ToolKind) -> &str {
        match tool {
            ToolKind::Reflow => &self.reflow_bin,
            ToolKind::Dehyphenate => &self.dehyphenate_bin,
        }
    }

    /// Resolve a tool binary on `PATH`.
    pub fn resolve(&self, tool: ToolKind) -> ToolResult<PathBuf> {
        let program = self.program(tool);
        which::which(program).map_err(|_| ToolError::not_found(tool, program))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ToolConfig::default();
        assert_eq!(config.program(ToolKind::Reflow), "k2pdfopt");
        assert_eq!(config.program(ToolKind::Dehyphenate), "ebook-modify");
        assert_eq!(config.timeout, Duration::from_secs(900));
    }

    #[test]
    fn test_missing_binary_is_not_found() {
        let config = ToolConfig {
            reflow_bin: "definitely-not-a-real-reflow-binary".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.resolve(ToolKind::Reflow),
            Err(ToolError::NotFound { .. })
        ));
    }
}
