//! Upload handler.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Multipart field carrying the document.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    /// Storage-relative path to pass to `POST /process`
    pub path: String,
    /// Client-side file name
    pub filename: String,
}

/// Store an uploaded document under `uploads/temp`.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let limit = state.config.max_upload_bytes;

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::validation("The file field must be a file"))?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            if bytes.len() + chunk.len() > limit {
                warn!(filename = %filename, limit, "Rejected oversized upload");
                return Err(ApiError::validation(format!(
                    "The file may not be greater than {} kilobytes",
                    limit / 1024
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(ApiError::validation("The uploaded file is empty"));
        }

        let path = state
            .storage
            .save_upload(&filename, &bytes)
            .await
            .map_err(|e| ApiError::bad_request(format!("File upload failed: {}", e)))?;

        metrics::record_upload(bytes.len());
        info!(path = %path, filename = %filename, size = bytes.len(), "Upload stored");

        return Ok(Json(UploadResponse {
            success: true,
            path,
            filename,
        }));
    }

    Err(ApiError::validation("The file field is required"))
}
