//! Local file storage for uploads and processed artifacts.
//!
//! Every path handed across the HTTP boundary or persisted on a job is
//! relative to a single storage root:
//!
//! ```text
//! <root>/uploads/temp/<uuid>.<ext>    uploaded sources
//! <root>/outputs/<job-id>/<name>      reflow artifacts
//! ```

pub mod config;
pub mod error;
pub mod local;

pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use local::{FileStorage, OUTPUT_DIR, UPLOAD_DIR};
