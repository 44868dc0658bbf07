//! External document tool wrappers.
//!
//! This crate provides:
//! - Option to argument translation for the reflow and dehyphenation tools
//! - A narrow [`ProcessRunner`] seam with a tokio implementation that
//!   enforces a wall-clock timeout and kills the child on timeout or drop
//! - [`ToolAdapter`], which classifies process results into success or
//!   a [`ToolError`] carrying the tool's diagnostic output

pub mod adapter;
pub mod command;
pub mod config;
pub mod error;
pub mod runner;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use adapter::ToolAdapter;
pub use command::{DehyphenateCommand, ReflowCommand, ToolInvocation, ToolKind};
pub use config::ToolConfig;
pub use error::{ToolError, ToolResult};
pub use runner::{ProcessOutput, ProcessRunner, TokioProcessRunner};
