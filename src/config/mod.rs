//! Configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Configuration for the tube queue engine and its consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of consumer workers
    pub worker_count: usize,

    /// Default capacity of newly created tubes
    pub max_tasks_per_tube: usize,

    /// Handler timeout in seconds
    pub task_timeout_secs: u64,

    /// How long a worker blocks in `take` before rechecking for shutdown
    pub poll_interval_ms: u64,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_secs: u64,

    /// Number of tasks the self-check harness pushes through each scenario
    pub task_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_count: num_cpus(),
            max_tasks_per_tube: 100_000,
            task_timeout_secs: 300,
            poll_interval_ms: 500,
            shutdown_timeout_secs: 30,
            task_count: 500,
        }
    }
}

impl Config {
    /// Create a new configuration with custom values
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count,
            ..Default::default()
        }
    }

    /// Worker take timeout as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Shutdown timeout as a [`Duration`]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Load configuration from file, environment variables, or defaults
    pub fn load() -> crate::Result<Self> {
        // Try to load from config file specified in environment variable
        if let Ok(config_path) = env::var("TUBE_QUEUE_CONFIG") {
            info!("Loading config from TUBE_QUEUE_CONFIG: {}", config_path);
            return Self::from_file(&config_path);
        }

        // Try default config file locations
        let default_paths = [
            "config.yaml",
            "config.toml",
            "config/config.yaml",
            "config/config.toml",
        ];

        for path in default_paths {
            if Path::new(path).exists() {
                info!("Loading config from: {}", path);
                return Self::from_file(path);
            }
        }

        // Try environment variables
        if let Some(config) = Self::from_env()? {
            info!("Loaded config from environment variables");
            return Ok(config);
        }

        // Fall back to defaults
        warn!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a file (YAML or TOML)
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()
            .map_err(|e| {
                crate::TubeQueueError::ConfigError(format!("Failed to load config file: {}", e))
            })?;

        let config: Config = settings.try_deserialize().map_err(|e| {
            crate::TubeQueueError::ConfigError(format!("Failed to parse config: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `TUBE_QUEUE_*` environment variables
    ///
    /// Returns `Ok(None)` when none of the variables is set.
    pub fn from_env() -> crate::Result<Option<Self>> {
        let mut config = Self::default();
        let mut found_any = false;

        found_any |= env_override("TUBE_QUEUE_WORKER_COUNT", &mut config.worker_count)?;
        found_any |= env_override(
            "TUBE_QUEUE_MAX_TASKS_PER_TUBE",
            &mut config.max_tasks_per_tube,
        )?;
        found_any |= env_override("TUBE_QUEUE_TASK_TIMEOUT_SECS", &mut config.task_timeout_secs)?;
        found_any |= env_override("TUBE_QUEUE_POLL_INTERVAL_MS", &mut config.poll_interval_ms)?;
        found_any |= env_override(
            "TUBE_QUEUE_SHUTDOWN_TIMEOUT_SECS",
            &mut config.shutdown_timeout_secs,
        )?;
        found_any |= env_override("TUBE_QUEUE_TASK_COUNT", &mut config.task_count)?;

        if !found_any {
            return Ok(None);
        }

        config.validate()?;
        Ok(Some(config))
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        let checks = [
            (self.worker_count == 0, "Worker count"),
            (self.max_tasks_per_tube == 0, "Max tasks per tube"),
            (self.task_timeout_secs == 0, "Task timeout"),
            (self.poll_interval_ms == 0, "Poll interval"),
            (self.shutdown_timeout_secs == 0, "Shutdown timeout"),
            (self.task_count == 0, "Task count"),
        ];

        for (failed, what) in checks {
            if failed {
                return Err(crate::TubeQueueError::ConfigError(format!(
                    "{what} must be greater than 0"
                )));
            }
        }

        Ok(())
    }
}

/// Overwrite `slot` from the variable `key` if it is set
fn env_override<T>(key: &str, slot: &mut T) -> crate::Result<bool>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => {
            *slot = val.parse().map_err(|e| {
                crate::TubeQueueError::ConfigError(format!("Invalid {}: {}", key, e))
            })?;
            Ok(true)
        }
        Err(_) => Ok(false),
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
