//! Configuration loader and validator for the sync service.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::queue::RangeBounds;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub sources: Sources,
    pub sync: Sync,
    pub roster: Roster,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub cache_ttl_seconds: u64,
}

/// Published CSV endpoints for each data source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sources {
    pub schedule_url: String,
    pub roster_url: String,
    pub doors_url: String,
}

/// Sync cadence, persistence batching and the working-hours window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sync {
    pub interval_seconds: u64,
    pub batch_size: usize,
    pub timezone: String,
    pub window_start_hour: u32,
    pub window_end_hour: u32,
}

/// Sub-range bounds of the rotation roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Roster {
    pub primary_max: i64,
    pub secondary_min: i64,
    pub secondary_max: i64,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    pub fn range_bounds(&self) -> RangeBounds {
        RangeBounds {
            primary_max: self.roster.primary_max,
            secondary_min: self.roster.secondary_min,
            secondary_max: self.roster.secondary_max,
        }
    }

    pub fn timezone(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.sync
            .timezone
            .parse()
            .map_err(|_| ConfigError::Invalid("sync.timezone is not a valid IANA timezone"))
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }

    if cfg.sources.schedule_url.trim().is_empty() {
        return Err(ConfigError::Invalid("sources.schedule_url must be non-empty"));
    }
    if cfg.sources.roster_url.trim().is_empty() {
        return Err(ConfigError::Invalid("sources.roster_url must be non-empty"));
    }
    if cfg.sources.doors_url.trim().is_empty() {
        return Err(ConfigError::Invalid("sources.doors_url must be non-empty"));
    }

    if cfg.sync.interval_seconds == 0 {
        return Err(ConfigError::Invalid("sync.interval_seconds must be > 0"));
    }
    if cfg.sync.batch_size == 0 {
        return Err(ConfigError::Invalid("sync.batch_size must be > 0"));
    }
    if cfg.sync.window_start_hour >= 24 || cfg.sync.window_end_hour > 24 {
        return Err(ConfigError::Invalid("sync window hours must be within a day"));
    }
    if cfg.sync.window_start_hour >= cfg.sync.window_end_hour {
        return Err(ConfigError::Invalid(
            "sync.window_start_hour must be before sync.window_end_hour",
        ));
    }
    cfg.timezone()?;

    if cfg.roster.primary_max < 1 {
        return Err(ConfigError::Invalid("roster.primary_max must be >= 1"));
    }
    if cfg.roster.secondary_min != cfg.roster.primary_max + 1 {
        return Err(ConfigError::Invalid(
            "roster.secondary_min must be roster.primary_max + 1",
        ));
    }
    if cfg.roster.secondary_max < cfg.roster.secondary_min {
        return Err(ConfigError::Invalid(
            "roster.secondary_max must be >= roster.secondary_min",
        ));
    }

    Ok(())
}

/// Example YAML matching the schema; used by tests and `--help` docs.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  cache_ttl_seconds: 300

sources:
  schedule_url: "https://example.com/schedule.csv"
  roster_url: "https://example.com/census.csv"
  doors_url: "https://example.com/doors.csv"

sync:
  interval_seconds: 180
  batch_size: 100
  timezone: "Europe/Madrid"
  window_start_hour: 7
  window_end_hour: 16

roster:
  primary_max: 449
  secondary_min: 450
  secondary_max: 535
"#
}
