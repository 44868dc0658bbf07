//! Status list and artifact download.

use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderValue};
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, warn};

use docflow_models::{JobId, ProcessedFileEntry};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProcessedFilesResponse {
    pub success: bool,
    pub data: Vec<ProcessedFileEntry>,
}

/// Every job, most recent first.
pub async fn list_processed_files(
    State(state): State<AppState>,
) -> ApiResult<Json<ProcessedFilesResponse>> {
    let jobs = state.repo.list().await?;
    let data = jobs
        .iter()
        .map(|job| ProcessedFileEntry::from_job(job, |job| AppState::download_url(job.id)))
        .collect();

    Ok(Json(ProcessedFilesResponse {
        success: true,
        data,
    }))
}

/// Stream a completed job's artifact as an attachment.
pub async fn download_processed_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    let not_found = || ApiError::not_found("File not found");

    let id: JobId = id.parse().map_err(|_| not_found())?;
    let job = state.repo.get(id).await?.ok_or_else(not_found)?;
    let relative = job.artifact_path().ok_or_else(not_found)?;

    let absolute = match state.storage.resolve(relative) {
        Ok(path) => path,
        Err(e) => {
            warn!(job_id = %id, path = %relative, "Stored artifact path rejected: {}", e);
            return Err(not_found());
        }
    };
    if !state.storage.exists(relative).await? {
        debug!(job_id = %id, path = %relative, "Artifact missing from storage");
        return Err(not_found());
    }

    let filename = FsPath::new(relative)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| id.to_string());

    let response = match ServeFile::new(&absolute).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    let mut response = response.map(Body::new);

    if response.status().is_success() {
        if let Ok(value) = HeaderValue::from_str(&content_disposition(&filename)) {
            response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
        }
    }

    Ok(response)
}

fn content_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() || c.is_ascii_control() => '_',
            c => c,
        })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_escapes_quotes() {
        assert_eq!(
            content_disposition("book_kindle.pdf"),
            "attachment; filename=\"book_kindle.pdf\""
        );
        assert_eq!(
            content_disposition("a\"b.pdf"),
            "attachment; filename=\"a_b.pdf\""
        );
        assert_eq!(
            content_disposition("café.pdf"),
            "attachment; filename=\"caf_.pdf\""
        );
    }
}
