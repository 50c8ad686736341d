//! Configuration builder for layered configuration loading

use crate::{Config, ConfigError, ConfigResult};
use config::{ConfigBuilder as ConfigBuilderInner, Environment, File, FileFormat};
use devwatch_types::DeviceCatalog;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration builder for loading configuration from multiple sources
///
/// Sources are applied on top of the built-in defaults in the order they
/// were added; later sources override earlier ones.
#[derive(Debug)]
pub struct ConfigBuilder {
    inner: ConfigBuilderInner<config::builder::DefaultState>,
    sources: Vec<ConfigSource>,
    env_separator: String,
}

#[derive(Debug, Clone)]
enum ConfigSource {
    File { path: PathBuf, format: FileFormat },
    Environment { prefix: String },
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            inner: config::Config::builder(),
            sources: Vec::new(),
            env_separator: "__".to_string(),
        }
    }

    /// Add a configuration file source
    ///
    /// Missing files are skipped when building.
    pub fn add_source_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let format = detect_format(&path);
        self.sources.push(ConfigSource::File { path, format });
        self
    }

    /// Add a configuration file source with explicit format
    pub fn add_source_file_with_format<P: AsRef<Path>>(
        mut self,
        path: P,
        format: FileFormat,
    ) -> Self {
        let path = path.as_ref().to_path_buf();
        self.sources.push(ConfigSource::File { path, format });
        self
    }

    /// Add environment variable source with prefix
    ///
    /// `PREFIX_MONITOR__POLL_INTERVAL_MS` overrides `monitor.poll_interval_ms`.
    pub fn add_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.sources.push(ConfigSource::Environment {
            prefix: prefix.into(),
        });
        self
    }

    /// Set environment variable separator (default: "__")
    pub fn env_separator<S: Into<String>>(mut self, separator: S) -> Self {
        self.env_separator = separator.into();
        self
    }

    /// Build and validate the configuration
    pub fn build(mut self) -> ConfigResult<Config> {
        let defaults = serde_yaml::to_value(Config::default())
            .map_err(|e| ConfigError::other(format!("Failed to serialize defaults: {}", e)))?;
        self.inner = self.inner.add_source(config::Config::try_from(&defaults)?);

        for source in &self.sources {
            match source {
                ConfigSource::File { path, format } => {
                    if path.exists() {
                        debug!(path = %path.display(), "Adding configuration file");
                        self.inner = self
                            .inner
                            .add_source(File::from(path.clone()).format(*format));
                    }
                }
                ConfigSource::Environment { prefix } => {
                    self.inner = self.inner.add_source(
                        Environment::with_prefix(prefix)
                            .prefix_separator("_")
                            .separator(&self.env_separator)
                            .try_parsing(true),
                    );
                }
            }
        }

        let config: Config = self.inner.build()?.try_deserialize()?;
        validate(&config)?;

        Ok(config)
    }

    /// Try to build the configuration, returning defaults on error
    pub fn build_or_default(self) -> Config {
        self.build().unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default configuration");
            Config::default()
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Detect file format from extension, defaulting to YAML
pub(crate) fn detect_format(path: &Path) -> FileFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => FileFormat::Toml,
        Some("json") => FileFormat::Json,
        _ => FileFormat::Yaml,
    }
}

/// Validate a loaded configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    if config.monitor.poll_interval_ms == 0 {
        return Err(ConfigError::invalid_value(
            "monitor.poll_interval_ms",
            "must be greater than 0",
        ));
    }

    if config.monitor.snapshot_timeout_ms == Some(0) {
        return Err(ConfigError::invalid_value(
            "monitor.snapshot_timeout_ms",
            "must be greater than 0 when set",
        ));
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        return Err(ConfigError::validation(
            "Log level must be one of: trace, debug, info, warn, error",
        ));
    }

    if let Some(devices) = &config.devices {
        validate_catalog(&DeviceCatalog::new(devices.clone()))?;
    }

    Ok(())
}

/// Validate catalog entries
///
/// Duplicate patterns are accepted since the first entry wins, but they are
/// reported.
pub fn validate_catalog(catalog: &DeviceCatalog) -> ConfigResult<()> {
    for (index, rule) in catalog.devices().iter().enumerate() {
        if rule.recognize_pattern.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                format!("devices[{}].recognize_pattern", index),
                "must not be empty",
            ));
        }
        if rule.name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                format!("devices[{}].name", index),
                "must not be empty",
            ));
        }
    }

    for pattern in catalog.duplicate_patterns() {
        warn!(pattern, "Duplicate recognize pattern in device catalog; first entry wins");
    }

    Ok(())
}
