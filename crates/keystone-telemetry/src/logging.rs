//! Structured logging for Keystone.
//!
//! Installs a `tracing-subscriber` registry with an [`EnvFilter`] and a single
//! `fmt` layer, JSON for production and pretty for development.
//!
//! # Example
//!
//! ```rust,ignore
//! use keystone_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::debug!(controller = "Users", action = "Show", "Dispatching action");
//! ```

use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g. "info" or "keystone_dispatch=trace,info").
    pub level: String,

    /// Whether to output JSON.
    pub json_format: bool,

    /// Whether to emit ANSI colours. Ignored for JSON output.
    pub ansi: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include thread IDs.
    pub thread_ids: bool,

    /// Whether to include the target (module path).
    pub include_target: bool,

    /// Service name, logged once at start-up.
    pub service_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            ansi: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
            service_name: "keystone".to_string(),
        }
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            ansi: true,
            file_line_info: true,
            ..Self::default()
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Sets the service name.
    #[must_use]
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }
}

/// Initializes the logging subsystem.
///
/// Does nothing when `config.enabled` is false.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] if the level directive does not
/// parse, and [`TelemetryError::LoggingInit`] if a global subscriber is
/// already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_thread_ids(config.thread_ids)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(config.ansi)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_thread_ids(config.thread_ids)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    info!(
        service.name = %config.service_name,
        level = %config.level,
        json = config.json_format,
        "Logging initialized"
    );
    Ok(())
}

/// Creates an env filter from a directive string.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] if the directive is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert!(config.json_format);
        assert_eq!(config.level, "info");
        assert_eq!(config, LogConfig::production());
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development().with_service_name("blog");
        assert!(!config.json_format);
        assert!(config.ansi);
        assert!(config.file_line_info);
        assert_eq!(config.level, "debug");
        assert_eq!(config.service_name, "blog");
    }

    #[test]
    fn test_create_env_filter() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("keystone_dispatch=trace,info").is_ok());
        assert!(matches!(
            create_env_filter("keystone=loud"),
            Err(TelemetryError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_disabled_logging_ignores_bad_filter() {
        let config = LogConfig {
            enabled: false,
            level: "keystone=loud".to_string(),
            ..Default::default()
        };
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_invalid_filter_rejected_before_install() {
        let config = LogConfig {
            level: "keystone=loud".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            init_logging(&config),
            Err(TelemetryError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_second_init_fails() {
        let config = LogConfig {
            level: "warn".to_string(),
            ..Default::default()
        };
        assert!(init_logging(&config).is_ok());
        assert!(matches!(
            init_logging(&config),
            Err(TelemetryError::LoggingInit(_))
        ));
    }
}
