//! Acquisition engine configuration
//!
//! All settings travel in an explicit [`AcquireConfig`] handed to the
//! components that need it; there is no ambient global. Environment loading
//! (`BRZ_*` variables) lives here so binaries stay thin.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bronze schema name.
pub const DEFAULT_BRONZE_SCHEMA: &str = "bronze";

/// Default number of extraction tasks running at once.
pub const DEFAULT_MAX_PARALLEL_TASKS: usize = 4;

/// Default destination URL for local development.
pub const DEFAULT_DESTINATION_URL: &str = "postgresql://localhost/brz";

/// Default maximum destination pool connections.
pub const DEFAULT_DESTINATION_MAX_CONNECTIONS: u32 = 10;

/// Default destination connection timeout in seconds.
pub const DEFAULT_DESTINATION_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Main engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquireConfig {
    /// Schema all bronze tables land in.
    pub bronze_schema: String,
    /// Upper bound on simultaneously running extraction tasks.
    pub max_parallel_tasks: usize,
    /// Per-task deadline in seconds; 0 disables deadlines.
    pub task_timeout_secs: u64,
    /// Destination store connection settings.
    pub destination: DestinationConfig,
}

/// Destination store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl AcquireConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `BRZ_BRONZE_SCHEMA`: bronze schema name (default: "bronze")
    /// - `BRZ_MAX_PARALLEL_TASKS`: concurrent task bound (default: 4)
    /// - `BRZ_TASK_TIMEOUT_SECS`: per-task deadline, 0 = none (default: 0)
    /// - `BRZ_DESTINATION_URL` / `DATABASE_URL`: destination store URL
    /// - `BRZ_DESTINATION_MAX_CONNECTIONS`: pool size (default: 10)
    /// - `BRZ_DESTINATION_CONNECT_TIMEOUT_SECS`: connect timeout (default: 10)
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            bronze_schema: std::env::var("BRZ_BRONZE_SCHEMA")
                .unwrap_or_else(|_| DEFAULT_BRONZE_SCHEMA.to_string()),
            max_parallel_tasks: std::env::var("BRZ_MAX_PARALLEL_TASKS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_PARALLEL_TASKS),
            task_timeout_secs: std::env::var("BRZ_TASK_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            destination: DestinationConfig::from_env(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bronze_schema.is_empty() {
            anyhow::bail!("BRZ_BRONZE_SCHEMA cannot be empty");
        }
        if self.max_parallel_tasks == 0 {
            anyhow::bail!("BRZ_MAX_PARALLEL_TASKS must be greater than 0");
        }
        if self.destination.url.is_empty() {
            anyhow::bail!("BRZ_DESTINATION_URL cannot be empty");
        }
        if self.destination.max_connections == 0 {
            anyhow::bail!("BRZ_DESTINATION_MAX_CONNECTIONS must be greater than 0");
        }
        Ok(())
    }

    /// Per-task deadline, when enabled.
    pub fn task_timeout(&self) -> Option<Duration> {
        (self.task_timeout_secs > 0).then(|| Duration::from_secs(self.task_timeout_secs))
    }
}

impl DestinationConfig {
    fn from_env() -> Self {
        Self {
            url: std::env::var("BRZ_DESTINATION_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .unwrap_or_else(|_| DEFAULT_DESTINATION_URL.to_string()),
            max_connections: std::env::var("BRZ_DESTINATION_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DESTINATION_MAX_CONNECTIONS),
            connect_timeout_secs: std::env::var("BRZ_DESTINATION_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DESTINATION_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Connect timeout as a Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            bronze_schema: DEFAULT_BRONZE_SCHEMA.to_string(),
            max_parallel_tasks: DEFAULT_MAX_PARALLEL_TASKS,
            task_timeout_secs: 0,
            destination: DestinationConfig::default(),
        }
    }
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DESTINATION_URL.to_string(),
            max_connections: DEFAULT_DESTINATION_MAX_CONNECTIONS,
            connect_timeout_secs: DEFAULT_DESTINATION_CONNECT_TIMEOUT_SECS,
        }
    }
}
