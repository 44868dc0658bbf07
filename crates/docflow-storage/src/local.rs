//! Filesystem-backed storage rooted at a single directory.

use std::path::{Component, Path, PathBuf};

use docflow_models::JobId;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};

/// Relative directory for uploaded sources.
pub const UPLOAD_DIR: &str = "uploads/temp";

/// Relative directory for per-job reflow outputs.
pub const OUTPUT_DIR: &str = "outputs";

/// Storage rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.root.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory layout under the root.
    pub async fn ensure_layout(&self) -> StorageResult<()> {
        fs::create_dir_all(self.root.join(UPLOAD_DIR)).await?;
        fs::create_dir_all(self.root.join(OUTPUT_DIR)).await?;
        Ok(())
    }

    /// Persist an uploaded file under a fresh unique name.
    ///
    /// Returns the storage-relative path, e.g. `uploads/temp/<uuid>.pdf`.
    pub async fn save_upload(&self, original_name: &str, bytes: &[u8]) -> StorageResult<String> {
        let file_name = match upload_extension(original_name) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let relative = format!("{}/{}", UPLOAD_DIR, file_name);
        let absolute = self.root.join(&relative);

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&absolute, bytes).await?;

        info!(path = %relative, size = bytes.len(), "Stored upload");
        Ok(relative)
    }

    /// Resolve a client-supplied relative path to an absolute one.
    ///
    /// Absolute paths and any `..`, root or prefix component are rejected.
    pub fn resolve(&self, relative: &str) -> StorageResult<PathBuf> {
        let trimmed = relative.trim();
        if trimmed.is_empty() {
            return Err(StorageError::invalid_path(relative));
        }

        let path = Path::new(trimmed);
        for component in path.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(StorageError::invalid_path(relative));
                }
            }
        }

        Ok(self.root.join(path))
    }

    /// Whether a relative path names an existing regular file.
    pub async fn exists(&self, relative: &str) -> StorageResult<bool> {
        let path = self.resolve(relative)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Relative output path for a job's artifact.
    pub fn output_path_for(&self, job_id: JobId, file_name: &str) -> StorageResult<String> {
        let name = Path::new(file_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| n != "." && n != "..")
            .ok_or_else(|| StorageError::invalid_path(file_name))?;

        Ok(format!("{}/{}/{}", OUTPUT_DIR, job_id, name))
    }

    /// Create the parent directory of a relative path.
    pub async fn prepare_parent(&self, relative: &str) -> StorageResult<PathBuf> {
        let absolute = self.resolve(relative)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(absolute)
    }

    /// Probe that the root accepts writes.
    pub async fn check_writable(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.root).await?;
        let probe = self.root.join(format!(".probe-{}", Uuid::new_v4()));
        fs::write(&probe, b"ok").await?;
        fs::remove_file(&probe).await?;
        debug!(root = %self.root.display(), "Storage root is writable");
        Ok(())
    }
}

/// Sanitized extension of an uploaded file name.
fn upload_extension(original_name: &str) -> Option<String> {
    let ext = Path::new(original_name).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
