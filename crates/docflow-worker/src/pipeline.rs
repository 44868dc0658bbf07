//! Stage planning.

use docflow_models::ProcessingOptions;

/// One external tool pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Reflow,
    Dehyphenate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Reflow => "reflow",
            Stage::Dehyphenate => "dehyphenate",
        }
    }
}

/// Ordered stages for a job.
///
/// Reflow always precedes dehyphenation so the latter edits the reflow
/// artifact rather than the upload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelinePlan {
    stages: Vec<Stage>,
}

impl PipelinePlan {
    pub fn for_options(options: &ProcessingOptions) -> Self {
        let mut stages = Vec::with_capacity(2);
        if options.kindle_friendly {
            stages.push(Stage::Reflow);
        }
        if options.remove_hyphens {
            stages.push(Stage::Dehyphenate);
        }
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// No tool runs; the input is the artifact.
    pub fn is_passthrough(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn describe(&self) -> String {
        if self.stages.is_empty() {
            return "passthrough".to_string();
        }
        self.stages
            .iter()
            .map(Stage::as_str)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}
