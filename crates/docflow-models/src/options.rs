//! Transformation options requested for a job.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Suffix appended to the input stem when no output name was requested.
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_kindle";

/// Options captured when a job is created. Immutable afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ProcessingOptions {
    /// Run the reflow tool
    #[serde(default)]
    pub kindle_friendly: bool,
    /// Run the dehyphenation tool
    #[serde(default)]
    pub remove_hyphens: bool,
    /// Target device width
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Target device height (recorded, not passed to the reflow tool)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Single page to render as a preview
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_page: Option<u32>,
    /// Requested artifact file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
    /// Page margin in inches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,
    /// Maximum number of columns to detect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_columns: Option<u32>,
    /// Output font size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
}

impl ProcessingOptions {
    /// True when neither transformation was requested.
    pub fn is_passthrough(&self) -> bool {
        !self.kindle_friendly && !self.remove_hyphens
    }

    /// File name for the reflow artifact.
    ///
    /// Uses `output_name` when present, otherwise `<input-stem>_kindle`. A name
    /// without an extension inherits the input file's extension.
    pub fn reflow_file_name(&self, input: &Path) -> String {
        let base = match self.output_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                let stem = input
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "output".to_string());
                format!("{}{}", stem, DEFAULT_OUTPUT_SUFFIX)
            }
        };

        if Path::new(&base).extension().is_some() {
            return base;
        }

        match input.extension() {
            Some(ext) => format!("{}.{}", base, ext.to_string_lossy()),
            None => base,
        }
    }
}
