//! Statistics engine configuration.
//!
//! Loaded from an optional TOML file plus environment variables with the
//! `MQSTATS__` prefix (double underscore for nesting), e.g.
//! `MQSTATS__SWEEPER__INTERVAL_SECS=300` or `MQSTATS__LOG__LEVEL=debug`.
//!
//! The publisher-map capacity and sweep budget are deliberately named
//! constants (`pub_clients`), not configuration.

use std::path::Path;
use std::time::Duration;

use config::{Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::Result;

/// Default hourly sweep interval in seconds.
pub const DEFAULT_SWEEP_INTERVAL: u64 = 60;

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sweep_interval() -> u64 {
    DEFAULT_SWEEP_INTERVAL
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level: error, warn, info, debug, trace.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Hourly sweeper configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweeperConfig {
    /// Seconds between hourly-window sweeps over all topics.
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub log: LogConfig,
    pub sweeper: SweeperConfig,
}

impl StatsConfig {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                File::new(&path.to_string_lossy(), FileFormat::Toml).required(true),
            );
        }
        let cfg = builder
            .add_source(Environment::with_prefix("MQSTATS").separator("__"))
            .build()?;
        Ok(cfg.try_deserialize()?)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweeper.interval_secs.max(1))
    }
}
