//! Configuration management for devwatch
//!
//! This crate loads the device catalog and runtime settings for devwatch,
//! supporting multiple configuration formats (YAML, TOML, JSON), validation,
//! hot-reload and environment variable overrides.
//!
//! # Features
//!
//! - **Multiple formats**: YAML, TOML and JSON configuration files
//! - **Validation**: rejects settings and catalog entries that cannot work
//! - **Hot-reload**: [`ConfigWatcher`] reloads the file on change and serves
//!   the fresh catalog to a running monitor
//! - **Environment overrides**: `DEVWATCH_MONITOR__POLL_INTERVAL_MS=500`
//! - **Logging**: [`LoggingConfig::init`] installs the `tracing` subscriber
//!
//! # Examples
//!
//! ```rust,no_run
//! use devwatch_config::ConfigLoader;
//!
//! let config = ConfigLoader::load_from_file("devwatch.yaml")?;
//! config.logging.init()?;
//!
//! match config.catalog() {
//!     Some(catalog) => println!("{} known devices", catalog.len()),
//!     None => println!("no device catalog configured"),
//! }
//! # Ok::<(), devwatch_config::ConfigError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use devwatch_types::{DeviceCatalog, RecognitionRule};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod builder;
pub mod error;
pub mod loader;
pub mod logging;
pub mod watcher;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use watcher::{ConfigWatcher, ConfigWatcherBuilder, WatchedCatalog};

/// Main configuration structure for devwatch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Polling driver settings
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Device catalog in priority order
    ///
    /// `None` means no catalog is configured, which is different from an
    /// empty list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices: Option<Vec<RecognitionRule>>,
}

impl Config {
    /// Build the device catalog from the configured rules
    pub fn catalog(&self) -> Option<DeviceCatalog> {
        self.devices.clone().map(DeviceCatalog::new)
    }

    /// Replace the configured rules
    pub fn with_devices(mut self, devices: Vec<RecognitionRule>) -> Self {
        self.devices = Some(devices);
        self
    }
}

/// Polling driver settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Time between two synchronizations, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up on a device snapshot after this many milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_timeout_ms: Option<u64>,
}

impl MonitorConfig {
    /// Poll interval as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Snapshot timeout as a [`Duration`], if one is configured
    pub fn snapshot_timeout(&self) -> Option<Duration> {
        self.snapshot_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            snapshot_timeout_ms: None,
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    2000
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level, overridden by `RUST_LOG` when set
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatting
    #[serde(default)]
    pub json_format: bool,
    /// Include the event target in log lines
    #[serde(default)]
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            with_target: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
