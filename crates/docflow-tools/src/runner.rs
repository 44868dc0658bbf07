//! Process runner seam.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::command::ToolInvocation;
use crate::error::{ToolError, ToolResult};

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Diagnostic text: stderr, or stdout when stderr is empty.
    ///
    /// The text is returned as the tool wrote it, minus trailing line breaks.
    pub fn diagnostic(&self) -> &str {
        let stderr = trim_line_breaks(&self.stderr);
        if stderr.is_empty() {
            trim_line_breaks(&self.stdout)
        } else {
            stderr
        }
    }
}

fn trim_line_breaks(text: &str) -> &str {
    text.trim_end_matches(['\r', '\n'])
}

/// Runs an invocation to completion.
///
/// A non-zero exit is reported through [`ProcessOutput::success`], not as an
/// error. Errors are reserved for processes that could not be started or did
/// not finish in time.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, invocation: &ToolInvocation, timeout: Duration) -> ToolResult<ProcessOutput>;
}

/// Runner backed by `tokio::process`.
///
/// The child is spawned with `kill_on_drop`, so aborting the task that awaits
/// it also terminates the tool.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &ToolInvocation, timeout: Duration) -> ToolResult<ProcessOutput> {
        let tool = invocation.tool;
        let program = which::which(&invocation.program)
            .map_err(|_| ToolError::not_found(tool, &invocation.program))?;

        debug!("Running {} tool: {}", tool, invocation.command_line());

        let mut child = Command::new(&program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::Spawn { tool, source })?;

        let mut stdout_task = child.stdout.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf).await;
                buf
            })
        });
        let mut stderr_task = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf).await;
                buf
            })
        });

        // Output pipes can outlive the tool when it leaves children behind, so
        // draining them shares the deadline with the exit.
        let finished = tokio::time::timeout(timeout, async {
            let status = child.wait().await?;
            let stdout = match stdout_task.as_mut() {
                Some(task) => task.await.unwrap_or_default(),
                None => Vec::new(),
            };
            let stderr = match stderr_task.as_mut() {
                Some(task) => task.await.unwrap_or_default(),
                None => Vec::new(),
            };
            Ok::<_, std::io::Error>((status, stdout, stderr))
        })
        .await;

        let (status, stdout, stderr) = match finished {
            Ok(collected) => collected?,
            Err(_) => {
                warn!(
                    "{} tool timed out after {} seconds, killing process",
                    tool,
                    timeout.as_secs()
                );
                let _ = child.kill().await;
                if let Some(task) = stdout_task {
                    task.abort();
                }
                if let Some(task) = stderr_task {
                    task.abort();
                }
                return Err(ToolError::TimedOut {
                    tool,
                    secs: timeout.as_secs(),
                });
            }
        };

        Ok(ProcessOutput {
            success: status.success(),
            exit_code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}
