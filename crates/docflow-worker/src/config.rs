//! Worker configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use docflow_storage::StorageConfig;
use docflow_tools::ToolConfig;

/// What to do at startup with jobs a previous process left pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StaleJobPolicy {
    /// Leave them pending
    #[default]
    Off,
    /// Hand them to the executor again
    Requeue,
    /// Mark them as errored
    Fail,
}

impl FromStr for StaleJobPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "" => Ok(StaleJobPolicy::Off),
            "requeue" => Ok(StaleJobPolicy::Requeue),
            "fail" => Ok(StaleJobPolicy::Fail),
            other => Err(format!("unknown stale job policy: {}", other)),
        }
    }
}

impl fmt::Display for StaleJobPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StaleJobPolicy::Off => "off",
            StaleJobPolicy::Requeue => "requeue",
            StaleJobPolicy::Fail => "fail",
        })
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Startup handling of orphaned pending jobs
    pub stale_job_policy: StaleJobPolicy,
    /// Attempts for the terminal status write, after the first
    pub terminal_write_retries: u32,
    /// SQLite database file
    pub database_path: PathBuf,
    pub storage: StorageConfig,
    pub tools: ToolConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let storage = StorageConfig::default();
        Self {
            max_concurrent_jobs: 2,
            shutdown_timeout: Duration::from_secs(30),
            stale_job_policy: StaleJobPolicy::Off,
            terminal_write_retries: 5,
            database_path: storage.root.join("docflow.db"),
            storage,
            tools: ToolConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let storage = StorageConfig::from_env();
        let database_path = std::env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| storage.root.join("docflow.db"));

        Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(2),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            stale_job_policy: std::env::var("STALE_JOB_POLICY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            terminal_write_retries: std::env::var("WORKER_TERMINAL_WRITE_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            database_path,
            storage,
            tools: ToolConfig::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_policy_parsing() {
        assert_eq!("off".parse::<StaleJobPolicy>().unwrap(), StaleJobPolicy::Off);
        assert_eq!("Requeue".parse::<StaleJobPolicy>().unwrap(), StaleJobPolicy::Requeue);
        assert_eq!(" fail ".parse::<StaleJobPolicy>().unwrap(), StaleJobPolicy::Fail);
        assert!("sometimes".parse::<StaleJobPolicy>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.stale_job_policy, StaleJobPolicy::Off);
        assert!(config.database_path.ends_with("docflow.db"));
    }
}
