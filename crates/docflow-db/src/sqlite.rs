//! SQLite implementation of [`JobRepository`].

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use docflow_models::{Job, JobId, JobStatus, NewJob, ProcessingOptions};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::repository::JobRepository;

const SELECT_COLUMNS: &str = "id, input_path, output_path, kindle_friendly, remove_hyphens, \
     width, height, preview_page, output_name, margin, max_columns, font_size, \
     status, error_message, created_at, updated_at";

/// A raw `processed_files` row.
#[derive(Debug, Clone)]
struct JobRow {
    id: i64,
    input_path: String,
    output_path: Option<String>,
    kindle_friendly: bool,
    remove_hyphens: bool,
    width: Option<u32>,
    height: Option<u32>,
    preview_page: Option<u32>,
    output_name: Option<String>,
    margin: Option<f64>,
    max_columns: Option<u32>,
    font_size: Option<u32>,
    status: String,
    error_message: Option<String>,
    created_at: String,
    updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            input_path: row.get("input_path")?,
            output_path: row.get("output_path")?,
            kindle_friendly: row.get("kindle_friendly")?,
            remove_hyphens: row.get("remove_hyphens")?,
            width: row.get("width")?,
            height: row.get("height")?,
            preview_page: row.get("preview_page")?,
            output_name: row.get("output_name")?,
            margin: row.get("margin")?,
            max_columns: row.get("max_columns")?,
            font_size: row.get("font_size")?,
            status: row.get("status")?,
            error_message: row.get("error_message")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

impl TryFrom<JobRow> for Job {
    type Error = DbError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status: JobStatus = row
            .status
            .parse()
            .map_err(|e| DbError::corrupt(format!("row {}: {}", row.id, e)))?;

        Ok(Job {
            id: JobId(row.id),
            input_path: row.input_path,
            output_path: row.output_path,
            options: ProcessingOptions {
                kindle_friendly: row.kindle_friendly,
                remove_hyphens: row.remove_hyphens,
                width: row.width,
                height: row.height,
                preview_page: row.preview_page,
                output_name: row.output_name,
                margin: row.margin,
                max_columns: row.max_columns,
                font_size: row.font_size,
            },
            status,
            error_message: row.error_message,
            created_at: parse_timestamp(row.id, &row.created_at)?,
            updated_at: parse_timestamp(row.id, &row.updated_at)?,
        })
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(id: i64, value: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::corrupt(format!("row {}: bad timestamp '{}': {}", id, value, e)))
}

fn find(conn: &Connection, id: JobId) -> DbResult<Option<Job>> {
    let sql = format!("SELECT {} FROM processed_files WHERE id = ?1", SELECT_COLUMNS);
    let row = conn
        .query_row(&sql, params![id.as_i64()], JobRow::from_row)
        .optional()?;
    row.map(Job::try_from).transpose()
}

fn query_jobs(conn: &Connection, sql: &str) -> DbResult<Vec<Job>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], JobRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(Job::try_from).collect()
}

/// Conditional terminal write. Only a pending row is updated.
fn finish_row(
    conn: &Connection,
    id: JobId,
    status: JobStatus,
    output_path: Option<&str>,
    error_message: Option<&str>,
) -> DbResult<Job> {
    let changed = conn.execute(
        "UPDATE processed_files
         SET status = ?2, output_path = ?3, error_message = ?4, updated_at = ?5
         WHERE id = ?1 AND status = ?6",
        params![
            id.as_i64(),
            status.as_str(),
            output_path,
            error_message,
            format_timestamp(Utc::now()),
            JobStatus::Pending.as_str(),
        ],
    )?;

    let job = find(conn, id)?.ok_or(DbError::NotFound(id))?;
    if changed == 0 {
        return Err(DbError::AlreadyTerminal {
            id,
            status: job.status,
        });
    }
    Ok(job)
}

/// SQLite-backed job repository.
#[derive(Clone)]
pub struct SqliteJobRepository {
    db: Database,
}

impl SqliteJobRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn open(path: &Path) -> DbResult<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Run a closure against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| DbError::Task(e.to_string()))?
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn create(&self, job: NewJob) -> DbResult<Job> {
        self.blocking(move |conn| {
            let now = format_timestamp(Utc::now());
            let opts = &job.options;
            conn.execute(
                "INSERT INTO processed_files (input_path, kindle_friendly, remove_hyphens,
                 width, height, preview_page, output_name, margin, max_columns, font_size,
                 status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
                params![
                    job.input_path,
                    opts.kindle_friendly,
                    opts.remove_hyphens,
                    opts.width,
                    opts.height,
                    opts.preview_page,
                    opts.output_name,
                    opts.margin,
                    opts.max_columns,
                    opts.font_size,
                    JobStatus::Pending.as_str(),
                    now,
                ],
            )?;
            let id = JobId(conn.last_insert_rowid());
            debug!(job_id = %id, "Inserted job");
            find(conn, id)?.ok_or(DbError::NotFound(id))
        })
        .await
    }

    async fn get(&self, id: JobId) -> DbResult<Option<Job>> {
        self.blocking(move |conn| find(conn, id)).await
    }

    async fn list(&self) -> DbResult<Vec<Job>> {
        self.blocking(|conn| {
            query_jobs(
                conn,
                &format!(
                    "SELECT {} FROM processed_files ORDER BY created_at DESC, id DESC",
                    SELECT_COLUMNS
                ),
            )
        })
        .await
    }

    async fn complete(&self, id: JobId, output_path: &str) -> DbResult<Job> {
        let output_path = output_path.to_string();
        self.blocking(move |conn| {
            finish_row(conn, id, JobStatus::Complete, Some(output_path.as_str()), None)
        })
        .await
    }

    async fn fail(&self, id: JobId, message: &str) -> DbResult<Job> {
        let message = message.to_string();
        self.blocking(move |conn| finish_row(conn, id, JobStatus::Error, None, Some(message.as_str())))
            .await
    }

    async fn list_pending(&self) -> DbResult<Vec<Job>> {
        self.blocking(|conn| {
            query_jobs(
                conn,
                &format!(
                    "SELECT {} FROM processed_files WHERE status = 'In Progress' \
                     ORDER BY created_at ASC, id ASC",
                    SELECT_COLUMNS
                ),
            )
        })
        .await
    }

    async fn ping(&self) -> DbResult<()> {
        self.blocking(|conn| {
            conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }
}
