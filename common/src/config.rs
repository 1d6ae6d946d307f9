// Configuration management with layered configuration (defaults, file, env)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub store: StoreConfig,
    pub worker: WorkerConfig,
    pub scheduler: SchedulerConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub url: String,
    /// Persistence namespace prepended to every queue key
    pub key_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Logical queue names, one poll timer each
    pub queues: Vec<String>,
    pub poll_interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Latest-N retention bound for the scheduled-job firing log
    pub entry_retention: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let defaults = Settings::default();

        let builder = Config::builder()
            // Start with default configuration
            .set_default("store.url", defaults.store.url)?
            .set_default("store.key_prefix", defaults.store.key_prefix)?
            .set_default("worker.queues", defaults.worker.queues)?
            .set_default(
                "worker.poll_interval_seconds",
                defaults.worker.poll_interval_seconds,
            )?
            .set_default(
                "scheduler.entry_retention",
                defaults.scheduler.entry_retention as u64,
            )?
            .set_default("observability.log_level", defaults.observability.log_level)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        if self.store.url.is_empty() {
            return Err("Store URL cannot be empty".to_string());
        }
        if self.store.key_prefix.is_empty() {
            return Err("Store key_prefix cannot be empty".to_string());
        }
        if self.worker.queues.is_empty() {
            return Err("Worker queues cannot be empty".to_string());
        }
        if self.worker.queues.iter().any(|q| q.is_empty()) {
            return Err("Worker queue names cannot be empty".to_string());
        }
        if self.worker.poll_interval_seconds == 0 {
            return Err("Worker poll_interval_seconds must be greater than 0".to_string());
        }
        if self.scheduler.entry_retention == 0 {
            return Err("Scheduler entry_retention must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                url: "redis://localhost:6379".to_string(),
                key_prefix: "conveyor".to_string(),
            },
            worker: WorkerConfig {
                queues: vec!["default".to_string()],
                poll_interval_seconds: 10,
            },
            scheduler: SchedulerConfig {
                entry_retention: 256,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
            },
        }
    }
}
