//! # Observability Infrastructure
//!
//! Structured logging setup for the provisioning binary. Progress logging is
//! informational only and never substitutes for the typed failure values the
//! pipeline returns.

use crate::errors::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Logging configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level directive (trace, debug, info, warn, error)
    pub log_level: String,

    /// Emit JSON structured logs instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json: false }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        let log_level =
            std::env::var("CREDPLANE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let json = std::env::var("CREDPLANE_LOG_JSON")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Self { log_level, json }
    }
}

/// Initialize the global tracing subscriber. `RUST_LOG` wins when set;
/// `verbose` forces a debug-level filter otherwise.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let directive = if verbose { "debug" } else { config.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .map_err(|error| Error::config(format!("invalid log level {directive:?}: {error}")))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|error| Error::config(format!("failed to initialize logging: {error}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_logging_config_defaults() {
        env::remove_var("CREDPLANE_LOG_LEVEL");
        env::remove_var("CREDPLANE_LOG_JSON");

        let config = LoggingConfig::from_env();
        assert_eq!(config.log_level, "info");
        assert!(!config.json);
    }

    #[test]
    #[serial]
    fn test_logging_config_from_env() {
        env::set_var("CREDPLANE_LOG_LEVEL", "debug");
        env::set_var("CREDPLANE_LOG_JSON", "true");

        let config = LoggingConfig::from_env();
        assert_eq!(config.log_level, "debug");
        assert!(config.json);

        env::remove_var("CREDPLANE_LOG_LEVEL");
        env::remove_var("CREDPLANE_LOG_JSON");
    }
}
