//! Processing request handler.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use validator::Validate;

use docflow_models::{NewJob, ProcessingOptions};
use docflow_worker::PipelinePlan;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

pub const FILE_NOT_FOUND_MESSAGE: &str = "File not found at the specified path";
pub const PROCESSING_STARTED_MESSAGE: &str = "File processing started";

/// Body of `POST /process`.
///
/// Booleans accept `true`/`false` or their string forms and numbers accept
/// numeric strings, so form-style clients work unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct ProcessRequest {
    #[validate(length(min = 1, max = 1024))]
    pub file_path: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub kindle_friendly: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub remove_hyphens: bool,
    #[serde(default, deserialize_with = "lenient::number")]
    #[validate(range(min = 1))]
    pub width: Option<u32>,
    #[serde(default, deserialize_with = "lenient::number")]
    #[validate(range(min = 1))]
    pub height: Option<u32>,
    #[serde(default, deserialize_with = "lenient::number")]
    #[validate(range(min = 1))]
    pub preview_page: Option<u32>,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub output_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    #[validate(range(min = 0.0))]
    pub margin: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    #[validate(range(min = 1))]
    pub max_columns: Option<u32>,
    #[serde(default, deserialize_with = "lenient::number")]
    #[validate(range(min = 1))]
    pub font_size: Option<u32>,
}

impl ProcessRequest {
    fn into_new_job(self) -> NewJob {
        let options = ProcessingOptions {
            kindle_friendly: self.kindle_friendly,
            remove_hyphens: self.remove_hyphens,
            width: self.width,
            height: self.height,
            preview_page: self.preview_page,
            output_name: self
                .output_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            margin: self.margin,
            max_columns: self.max_columns,
            font_size: self.font_size,
        };
        NewJob::new(self.file_path.trim(), options)
    }
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub id: String,
    pub message: String,
}

/// Create a job for an uploaded file and hand it to the worker.
pub async fn process(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<ProcessRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<ProcessResponse>)> {
    request.validate()?;

    // Unsafe paths surface as 422 through StorageError::InvalidPath
    if !state.storage.exists(request.file_path.trim()).await? {
        return Err(ApiError::not_found(FILE_NOT_FOUND_MESSAGE));
    }

    let new_job = request.into_new_job();
    let pipeline = PipelinePlan::for_options(&new_job.options).describe();
    let job = state.repo.create(new_job).await?;

    if let Err(e) = state.queue.enqueue(job.id) {
        let message = format!("Failed to start file processing: {}", e);
        error!(job_id = %job.id, "{}", message);
        if let Err(fail_err) = state.repo.fail(job.id, &message).await {
            error!(job_id = %job.id, "Could not mark unqueued job as failed: {}", fail_err);
        }
        return Err(ApiError::internal(message));
    }

    metrics::record_job_enqueued(&pipeline);
    info!(
        job_id = %job.id,
        input = %job.input_path,
        pipeline = %pipeline,
        "Processing job submitted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(ProcessResponse {
            success: true,
            id: job.id.to_string(),
            message: PROCESSING_STARTED_MESSAGE.to_string(),
        }),
    ))
}

mod lenient {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::de::{Deserializer, Error};
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText<T> {
        Number(T),
        Text(String),
    }

    pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Flag>::deserialize(deserializer)? {
            None => Ok(false),
            Some(Flag::Bool(value)) => Ok(value),
            Some(Flag::Text(text)) => match text.trim() {
                "true" => Ok(true),
                "false" | "" => Ok(false),
                other => Err(D::Error::custom(format!(
                    "expected true or false, got \"{}\"",
                    other
                ))),
            },
        }
    }

    pub fn number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + FromStr,
        T::Err: Display,
    {
        match Option::<NumberOrText<T>>::deserialize(deserializer)? {
            None => Ok(None),
            Some(NumberOrText::Number(value)) => Ok(Some(value)),
            Some(NumberOrText::Text(text)) if text.trim().is_empty() => Ok(None),
            Some(NumberOrText::Text(text)) => text
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| D::Error::custom(format!("invalid number \"{}\": {}", text, e))),
        }
    }
}
