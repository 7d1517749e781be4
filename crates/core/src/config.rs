use crate::error::{Error, Result, ResultExt};
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Main configuration structure for the pollwatch system
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Change-detection engine configuration
    #[serde(default)]
    pub watcher: WatcherConfig,
}

/// Configuration for the polling change-detection engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Interval between full scans in milliseconds
    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,

    /// Interval between notified-only scans in milliseconds
    #[serde(default = "default_notify_interval_ms")]
    pub notify_interval_ms: u64,

    /// Name of the engine's own log file, never reported
    #[serde(default = "default_log_file_name")]
    pub log_file_name: String,

    /// Skip entries whose name starts with a dot
    #[serde(default = "default_true")]
    pub exclude_hidden: bool,

    /// Skip build output directories (`target`, `bin`, `maven`)
    #[serde(default = "default_true")]
    pub exclude_build_output: bool,

    /// Additional glob patterns to exclude
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

fn default_scan_interval_ms() -> u64 {
    5000
}

fn default_notify_interval_ms() -> u64 {
    250
}

fn default_log_file_name() -> String {
    "pollwatch.log".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: default_scan_interval_ms(),
            notify_interval_ms: default_notify_interval_ms(),
            log_file_name: default_log_file_name(),
            exclude_hidden: default_true(),
            exclude_build_output: default_true(),
            ignore_patterns: Vec::new(),
        }
    }
}

impl WatcherConfig {
    /// Get the full scan interval
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    /// Get the notified-only scan interval
    pub fn notify_interval(&self) -> Duration {
        Duration::from_millis(self.notify_interval_ms)
    }

    /// Validates the watcher section
    pub fn validate(&self) -> Result<()> {
        if self.scan_interval_ms == 0 {
            return Err(Error::config(
                "Invalid scan_interval_ms: must be greater than 0".to_string(),
            ));
        }

        if self.notify_interval_ms == 0 {
            return Err(Error::config(
                "Invalid notify_interval_ms: must be greater than 0".to_string(),
            ));
        }

        if self.notify_interval_ms > self.scan_interval_ms {
            return Err(Error::config(format!(
                "Invalid notify_interval_ms {}: must not exceed scan_interval_ms {}",
                self.notify_interval_ms, self.scan_interval_ms
            )));
        }

        if self.log_file_name.trim().is_empty() {
            return Err(Error::config(
                "Invalid log_file_name: must not be empty".to_string(),
            ));
        }

        for pattern in &self.ignore_patterns {
            glob::Pattern::new(pattern).map_err(|e| {
                Error::config(format!("Invalid ignore pattern '{pattern}': {e}"))
            })?;
        }

        Ok(())
    }
}

impl Config {
    /// Loads configuration from a TOML file with environment variable overrides
    ///
    /// Environment variables are prefixed with `POLLWATCH_` and use double underscores
    /// for nested values. For example:
    /// - `POLLWATCH_WATCHER__SCAN_INTERVAL_MS=1000`
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        // Add the config file if it exists
        if path.exists() {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path));
        } else {
            debug!("No configuration file at {}, using defaults", path.display());
        }

        builder = builder.add_source(
            Environment::with_prefix("POLLWATCH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize config: {e}")))
    }

    /// Creates a config from a TOML string (useful for testing)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        self.watcher.validate()
    }

    /// Saves the configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, toml_string)
            .context(format!("Failed to write config file {}", path.display()))?;

        Ok(())
    }
}
