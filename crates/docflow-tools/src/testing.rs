//! Recording fake runner for tests.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::command::{ToolInvocation, ToolKind};
use crate::error::{ToolError, ToolResult};
use crate::runner::{ProcessOutput, ProcessRunner};

/// What the fake does when a tool is invoked.
#[derive(Debug, Clone)]
pub enum FakeBehavior {
    /// Exit 0. For reflow, writes the `-o` target first.
    Succeed,
    /// Exit 0 without writing anything.
    SucceedWithoutOutput,
    /// Exit 1 with the given stderr.
    Fail(String),
    /// Write the `-o` target, then exit 1 with the given stderr.
    FailAfterWriting(String),
    /// Report a timeout.
    TimeOut,
    /// Panic inside the runner.
    Panic,
}

/// A [`ProcessRunner`] that records invocations instead of spawning.
#[derive(Debug)]
pub struct RecordingRunner {
    reflow: FakeBehavior,
    dehyphenate: FakeBehavior,
    delay: Option<Duration>,
    calls: Mutex<Vec<ToolInvocation>>,
}

impl Default for RecordingRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self {
            reflow: FakeBehavior::Succeed,
            dehyphenate: FakeBehavior::Succeed,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn reflow(mut self, behavior: FakeBehavior) -> Self {
        self.reflow = behavior;
        self
    }

    pub fn dehyphenate(mut self, behavior: FakeBehavior) -> Self {
        self.dehyphenate = behavior;
        self
    }

    /// Sleep before answering each invocation.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Invocations seen so far, in order.
    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Tools invoked so far, in order.
    pub fn tools(&self) -> Vec<ToolKind> {
        self.invocations().iter().map(|i| i.tool).collect()
    }
}

fn output_target(invocation: &ToolInvocation) -> Option<PathBuf> {
    let pos = invocation.args.iter().position(|a| a == "-o")?;
    invocation.args.get(pos + 1).map(PathBuf::from)
}

async fn write_target(invocation: &ToolInvocation) {
    if let Some(target) = output_target(invocation) {
        if let Some(parent) = target.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        let _ = tokio::fs::write(&target, b"reflowed").await;
    }
}

fn exited(success: bool, stderr: &str) -> ProcessOutput {
    ProcessOutput {
        success,
        exit_code: Some(if success { 0 } else { 1 }),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
    async fn run(&self, invocation: &ToolInvocation, timeout: Duration) -> ToolResult<ProcessOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let behavior = match invocation.tool {
            ToolKind::Reflow => &self.reflow,
            ToolKind::Dehyphenate => &self.dehyphenate,
        };

        match behavior {
            FakeBehavior::Succeed => {
                write_target(invocation).await;
                Ok(exited(true, ""))
            }
            FakeBehavior::SucceedWithoutOutput => Ok(exited(true, "")),
            FakeBehavior::Fail(stderr) => Ok(exited(false, stderr)),
            FakeBehavior::FailAfterWriting(stderr) => {
                write_target(invocation).await;
                Ok(exited(false, stderr))
            }
            FakeBehavior::TimeOut => Err(ToolError::TimedOut {
                tool: invocation.tool,
                secs: timeout.as_secs(),
            }),
            FakeBehavior::Panic => panic!("{} runner exploded", invocation.tool),
        }
    }
}
