//! Success/failure classification for tool runs.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use docflow_models::ProcessingOptions;
use tracing::{info, warn};

use crate::command::{DehyphenateCommand, ReflowCommand, ToolInvocation, ToolKind};
use crate::config::ToolConfig;
use crate::error::{ToolError, ToolResult};
use crate::runner::{ProcessRunner, TokioProcessRunner};

/// Runs the reflow and dehyphenation tools and turns their results into
/// [`ToolResult`]s.
#[derive(Clone)]
pub struct ToolAdapter {
    runner: Arc<dyn ProcessRunner>,
    config: ToolConfig,
}

impl ToolAdapter {
    pub fn new(runner: Arc<dyn ProcessRunner>, config: ToolConfig) -> Self {
        Self { runner, config }
    }

    /// Adapter that spawns real processes.
    pub fn with_system_runner(config: ToolConfig) -> Self {
        Self::new(Arc::new(TokioProcessRunner::new()), config)
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Reflow `input` into `output`.
    ///
    /// Succeeds only when the tool exits successfully and `output` exists.
    /// On any failure a partially written `output` is removed.
    pub async fn reflow(
        &self,
        input: &Path,
        options: &ProcessingOptions,
        output: &Path,
    ) -> ToolResult<()> {
        let invocation = ReflowCommand::from_options(input, output, options)
            .threads(self.config.reflow_threads)
            .invocation(self.config.program(ToolKind::Reflow));

        let result = match self.execute(&invocation).await {
            Ok(()) => match tokio::fs::try_exists(output).await {
                Ok(true) => Ok(()),
                _ => Err(ToolError::MissingOutput {
                    tool: ToolKind::Reflow,
                    path: output.to_path_buf(),
                }),
            },
            Err(e) => Err(e),
        };

        if result.is_err() {
            remove_partial_output(output).await;
        }
        result
    }

    /// Remove hyphenation from `target` in place.
    pub async fn dehyphenate(&self, target: &Path) -> ToolResult<()> {
        let invocation = DehyphenateCommand::new(target)
            .invocation(self.config.program(ToolKind::Dehyphenate));
        self.execute(&invocation).await
    }

    async fn execute(&self, invocation: &ToolInvocation) -> ToolResult<()> {
        let tool = invocation.tool;
        let start = Instant::now();
        let result = self.runner.run(invocation, self.config.timeout).await;

        metrics::histogram!("docflow_tool_duration_seconds", "tool" => tool.as_str())
            .record(start.elapsed().as_secs_f64());

        let output = result?;
        if output.success {
            info!(
                tool = tool.as_str(),
                duration_ms = start.elapsed().as_millis() as u64,
                "{} tool finished",
                tool
            );
            Ok(())
        } else {
            Err(ToolError::failed(tool, output.exit_code, output.diagnostic()))
        }
    }
}

async fn remove_partial_output(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => warn!(path = %output.display(), "Removed partial reflow output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %output.display(), "Failed to remove partial reflow output: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{FakeBehavior, RecordingRunner};

    fn adapter(runner: Arc<RecordingRunner>) -> ToolAdapter {
        ToolAdapter::new(runner, ToolConfig::default())
    }

    #[tokio::test]
    async fn test_reflow_success_requires_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out.pdf");

        let runner = Arc::new(RecordingRunner::new());
        adapter(runner.clone())
            .reflow(&input, &ProcessingOptions::default(), &output)
            .await
            .unwrap();
        assert!(output.exists());

        let silent = Arc::new(RecordingRunner::new().reflow(FakeBehavior::SucceedWithoutOutput));
        let err = adapter(silent)
            .reflow(&input, &ProcessingOptions::default(), &dir.path().join("none.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::MissingOutput { .. }));
    }

    #[tokio::test]
    async fn test_reflow_failure_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.pdf");

        let runner = Arc::new(
            RecordingRunner::new().reflow(FakeBehavior::FailAfterWriting("bad margin value".into())),
        );
        let err = adapter(runner)
            .reflow(&dir.path().join("in.pdf"), &ProcessingOptions::default(), &output)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "reflow tool exited with error: bad margin value");
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_timeout_is_failure() {
        let runner = Arc::new(RecordingRunner::new().dehyphenate(FakeBehavior::TimeOut));
        let err = adapter(runner.clone())
            .dehyphenate(Path::new("/tmp/book.epub"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::TimedOut { secs: 900, .. }));
        assert_eq!(runner.invocations().len(), 1);
    }

    #[tokio::test]
    async fn test_uses_configured_timeout_and_program() {
        let runner = Arc::new(RecordingRunner::new());
        let config = ToolConfig {
            dehyphenate_bin: "/opt/calibre/ebook-modify".to_string(),
            timeout: Duration::from_secs(5),
            ..Default::default()
        };
        ToolAdapter::new(runner.clone(), config)
            .dehyphenate(Path::new("/s/a.epub"))
            .await
            .unwrap();

        let calls = runner.invocations();
        assert_eq!(calls[0].program, "/opt/calibre/ebook-modify");
        assert_eq!(calls[0].args, vec!["/s/a.epub"]);
    }
}
