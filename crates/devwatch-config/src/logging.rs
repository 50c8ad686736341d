//! Logging setup

use crate::{ConfigError, ConfigResult, LoggingConfig};
use tracing_subscriber::{fmt, EnvFilter};

impl LoggingConfig {
    /// Build the event filter; `RUST_LOG` takes precedence over `level`
    pub fn env_filter(&self) -> ConfigResult<EnvFilter> {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .map_err(|e| ConfigError::logging(format!("Invalid log filter '{}': {}", self.level, e)))
    }

    /// Install the global `tracing` subscriber
    ///
    /// Fails if a global subscriber is already installed.
    pub fn init(&self) -> ConfigResult<()> {
        let filter = self.env_filter()?;
        let builder = fmt()
            .with_env_filter(filter)
            .with_target(self.with_target)
            .with_thread_ids(false)
            .with_thread_names(false);

        let result = if self.json_format {
            builder.json().try_init()
        } else {
            builder.try_init()
        };

        result.map_err(|e| ConfigError::logging(e.to_string()))
    }
}
