//! Command builders for the external tools.
//!
//! Builders only translate options into argument lists. Spawning lives in
//! [`crate::runner`].

use std::fmt;
use std::path::{Path, PathBuf};

use docflow_models::ProcessingOptions;

/// The external tools the pipeline can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Kindle-friendly reflow (k2pdfopt)
    Reflow,
    /// In-place hyphen removal (ebook-modify)
    Dehyphenate,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Reflow => "reflow",
            ToolKind::Dehyphenate => "dehyphenate",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub tool: ToolKind,
    pub program: String,
    pub args: Vec<String>,
}

impl ToolInvocation {
    /// Render for logging.
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Builder for reflow tool commands.
#[derive(Debug, Clone)]
pub struct ReflowCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Worker thread count passed via `-nt`
    threads: u32,
    width: Option<u32>,
    preview_page: Option<u32>,
    margin: Option<f64>,
    max_columns: Option<u32>,
    font_size: Option<u32>,
}

impl ReflowCommand {
    /// Create a new reflow command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            threads: 8,
            width: None,
            preview_page: None,
            margin: None,
            max_columns: None,
            font_size: None,
        }
    }

    /// Create a command carrying every relevant option of a job.
    ///
    /// `height` is not forwarded.
    pub fn from_options(
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        options: &ProcessingOptions,
    ) -> Self {
        Self {
            width: options.width,
            preview_page: options.preview_page,
            margin: options.margin,
            max_columns: options.max_columns,
            font_size: options.font_size,
            ..Self::new(input, output)
        }
    }

    /// Set thread count.
    pub fn threads(mut self, threads: u32) -> Self {
        self.threads = threads;
        self
    }

    /// Set target device width.
    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    /// Render only a single page.
    pub fn preview_page(mut self, page: u32) -> Self {
        self.preview_page = Some(page);
        self
    }

    /// Set page margin.
    pub fn margin(mut self, margin: f64) -> Self {
        self.margin = Some(margin);
        self
    }

    /// Set maximum column count.
    pub fn max_columns(mut self, columns: u32) -> Self {
        self.max_columns = Some(columns);
        self
    }

    /// Set font size.
    pub fn font_size(mut self, size: u32) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-nt".to_string(), self.threads.to_string()];

        if let Some(width) = self.width {
            args.push(format!("-dev_{}", width));
        }
        if let Some(page) = self.preview_page {
            args.push("-p".to_string());
            args.push(page.to_string());
        }
        if let Some(margin) = self.margin {
            args.push("-m".to_string());
            args.push(margin.to_string());
        }
        if let Some(columns) = self.max_columns {
            args.push("-col".to_string());
            args.push(columns.to_string());
        }
        if let Some(size) = self.font_size {
            args.push("-fs".to_string());
            args.push(size.to_string());
        }

        args.push("-o".to_string());
        args.push(self.output.to_string_lossy().to_string());
        args.push(self.input.to_string_lossy().to_string());

        args
    }

    pub fn invocation(&self, program: impl Into<String>) -> ToolInvocation {
        ToolInvocation {
            tool: ToolKind::Reflow,
            program: program.into(),
            args: self.build_args(),
        }
    }
}

/// Builder for the dehyphenation tool. Takes a single path and edits it in place.
#[derive(Debug, Clone)]
pub struct DehyphenateCommand {
    target: PathBuf,
}

impl DehyphenateCommand {
    pub fn new(target: impl AsRef<Path>) -> Self {
        Self {
            target: target.as_ref().to_path_buf(),
        }
    }

    pub fn build_args(&self) -> Vec<String> {
        vec![self.target.to_string_lossy().to_string()]
    }

    pub fn invocation(&self, program: impl Into<String>) -> ToolInvocation {
        ToolInvocation {
            tool: ToolKind::Dehyphenate,
            program: program.into(),
            args: self.build_args(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_reflow_args() {
        let args = ReflowCommand::new("/s/in.pdf", "/s/out.pdf").build_args();
        assert_eq!(args, vec!["-nt", "8", "-o", "/s/out.pdf", "/s/in.pdf"]);
    }

    #[test]
    fn test_full_reflow_args_in_order() {
        let options = ProcessingOptions {
            kindle_friendly: true,
            width: Some(600),
            height: Some(800),
            preview_page: Some(3),
            margin: Some(0.5),
            max_columns: Some(2),
            font_size: Some(12),
            ..Default::default()
        };
        let args = ReflowCommand::from_options("in.pdf", "out.pdf", &options)
            .threads(4)
            .build_args();

        assert_eq!(
            args,
            vec![
                "-nt", "4", "-dev_600", "-p", "3", "-m", "0.5", "-col", "2", "-fs", "12", "-o",
                "out.pdf", "in.pdf"
            ]
        );
        assert!(!args.iter().any(|a| a.contains("800")));
    }

    #[test]
    fn test_zero_margin_is_forwarded() {
        let args = ReflowCommand::new("a", "b").margin(0.0).build_args();
        assert_eq!(&args[2..4], &["-m".to_string(), "0".to_string()]);
    }

    #[test]
    fn test_dehyphenate_invocation() {
        let inv = DehyphenateCommand::new("/s/out.epub").invocation("ebook-modify");
        assert_eq!(inv.tool, ToolKind::Dehyphenate);
        assert_eq!(inv.command_line(), "ebook-modify /s/out.epub");
    }
}
