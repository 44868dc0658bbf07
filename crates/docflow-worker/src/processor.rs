//! Single-job processing.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tracing::Instrument;

use docflow_db::{DbError, JobRepository};
use docflow_models::{Job, JobId, JobOutcome};
use docflow_storage::FileStorage;
use docflow_tools::ToolAdapter;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::pipeline::{PipelinePlan, Stage};
use crate::retry::{retry_async, RetryConfig};

const OPERATION: &str = "document_processing";

/// Shared dependencies for processing jobs.
#[derive(Clone)]
pub struct ProcessingContext {
    pub repo: Arc<dyn JobRepository>,
    pub storage: FileStorage,
    pub tools: ToolAdapter,
    /// Backoff for loading the job before processing
    pub claim_retry: RetryConfig,
    /// Backoff for the terminal status write
    pub terminal_write_retry: RetryConfig,
}

impl ProcessingContext {
    pub fn new(repo: Arc<dyn JobRepository>, storage: FileStorage, tools: ToolAdapter) -> Self {
        Self {
            repo,
            storage,
            tools,
            claim_retry: RetryConfig::new("job_claim"),
            terminal_write_retry: RetryConfig::new("terminal_status_write").with_max_retries(5),
        }
    }

    /// Build a context from configuration, spawning real processes.
    pub fn from_config(config: &WorkerConfig, repo: Arc<dyn JobRepository>) -> Self {
        let mut ctx = Self::new(
            repo,
            FileStorage::from_config(&config.storage),
            ToolAdapter::with_system_runner(config.tools.clone()),
        );
        ctx.claim_retry = RetryConfig::new("job_claim")
            .with_max_retries(config.terminal_write_retries)
            .with_base_delay(Duration::from_millis(200));
        ctx.terminal_write_retry = RetryConfig::new("terminal_status_write")
            .with_max_retries(config.terminal_write_retries)
            .with_base_delay(Duration::from_millis(200));
        ctx
    }
}

/// Run the pipeline for a job and return the storage-relative artifact path.
///
/// Does not touch the job record.
pub async fn process_job(ctx: &ProcessingContext, job: &Job, logger: &JobLogger) -> WorkerResult<String> {
    let input = ctx.storage.resolve(&job.input_path)?;
    if !tokio::fs::try_exists(&input).await.unwrap_or(false) {
        return Err(WorkerError::input_missing(&job.input_path));
    }

    let plan = PipelinePlan::for_options(&job.options);
    if plan.is_passthrough() {
        logger.log_progress("no transformation requested");
        return Ok(job.input_path.clone());
    }

    let mut current = job.input_path.clone();
    for stage in plan.stages() {
        match stage {
            Stage::Reflow => {
                let source = ctx.storage.resolve(&current)?;
                let file_name = job.options.reflow_file_name(&source);
                let output = ctx.storage.output_path_for(job.id, &file_name)?;
                let output_abs = ctx.storage.prepare_parent(&output).await?;

                logger.log_progress(&format!("reflowing into {}", output));
                ctx.tools.reflow(&source, &job.options, &output_abs).await?;
                current = output;
            }
            Stage::Dehyphenate => {
                let target = ctx.storage.resolve(&current)?;
                logger.log_progress(&format!("removing hyphens from {}", current));
                ctx.tools.dehyphenate(&target).await?;
            }
        }
    }

    Ok(current)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Claim and fully process one job.
///
/// Returns `Ok(None)` when the job does not exist or is no longer pending.
/// Otherwise the job always reaches a terminal state: tool failures and
/// panics become `error` outcomes, and the terminal write is retried. If the
/// job cannot be loaded at all, it is marked failed on a best-effort basis.
pub async fn run_job(ctx: Arc<ProcessingContext>, job_id: JobId) -> WorkerResult<Option<Job>> {
    let logger = JobLogger::new(job_id, OPERATION);
    let span = logger.span();
    run_job_inner(ctx, job_id, logger).instrument(span).await
}

async fn run_job_inner(
    ctx: Arc<ProcessingContext>,
    job_id: JobId,
    logger: JobLogger,
) -> WorkerResult<Option<Job>> {
    let claimed = retry_async(&ctx.claim_retry, DbError::is_retryable, || {
        ctx.repo.get(job_id)
    })
    .await
    .into_result();

    let job = match claimed {
        Ok(Some(job)) => job,
        Ok(None) => {
            logger.log_warning("job not found, skipping");
            return Ok(None);
        }
        Err(e) => {
            logger.log_error(&format!("failed to load job: {}", e));
            if let Err(write_err) = ctx
                .repo
                .fail(job_id, &format!("Failed to load job: {}", e))
                .await
            {
                logger.log_error(&format!("failed to record terminal status: {}", write_err));
            }
            return Err(e.into());
        }
    };
    if job.is_terminal() {
        logger.log_warning(&format!("job already {}, skipping", job.status));
        return Ok(None);
    }

    let plan = PipelinePlan::for_options(&job.options);
    logger.log_start(&format!("{} ({})", job.input_path, plan.describe()));
    let _in_flight = metrics::InFlightGuard::start();
    let start = Instant::now();

    let result = AssertUnwindSafe(process_job(&ctx, &job, &logger))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(WorkerError::fault(panic_message(payload))));

    let outcome = match result {
        Ok(output_path) => JobOutcome::complete(output_path),
        Err(e) => {
            logger.log_error(&e.to_string());
            JobOutcome::error(e.to_string())
        }
    };

    let written = retry_async(
        &ctx.terminal_write_retry,
        DbError::is_retryable,
        || ctx.repo.finish(job_id, &outcome),
    )
    .await
    .into_result();

    let elapsed = start.elapsed().as_secs_f64();
    match written {
        Ok(job) => {
            match &outcome {
                JobOutcome::Complete { output_path } => {
                    metrics::record_job_completed(elapsed);
                    logger.log_completion(output_path);
                }
                JobOutcome::Error { .. } => metrics::record_job_failed(elapsed),
            }
            Ok(Some(job))
        }
        Err(e) => {
            metrics::record_job_failed(elapsed);
            logger.log_error(&format!("failed to record terminal status: {}", e));
            Err(e.into())
        }
    }
}
