//! Storage configuration.

use std::path::PathBuf;

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory all relative paths resolve against
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./storage"),
        }
    }
}

impl StorageConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            root: std::env::var("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| Self::default().root),
        }
    }
}
