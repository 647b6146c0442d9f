//! Configuration schema types.
//!
//! Every section rejects unknown fields and fills missing ones with defaults.

use keystone_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

/// Application section.
///
/// # Example
///
/// ```
/// use keystone_config::AppConfig;
///
/// let app = AppConfig {
///     name: "blog".to_string(),
///     run_mode: "prod".to_string(),
///     dev_mode: false,
///     default_format: "html".to_string(),
/// };
/// assert_eq!(app.run_mode, "prod");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Application name, also used as the logging service name.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Run mode published to templates as `RunMode` (e.g. "dev", "prod").
    #[serde(default = "default_run_mode")]
    pub run_mode: String,

    /// Published to templates as `DevMode`.
    #[serde(default = "default_true")]
    pub dev_mode: bool,

    /// Response format used when a request does not negotiate one.
    #[serde(default = "default_format")]
    pub default_format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            run_mode: default_run_mode(),
            dev_mode: true,
            default_format: default_format(),
        }
    }
}

fn default_app_name() -> String {
    "keystone-app".to_string()
}

fn default_run_mode() -> String {
    "dev".to_string()
}

fn default_format() -> String {
    "html".to_string()
}

fn default_true() -> bool {
    true
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (e.g. "info", "keystone_dispatch=trace,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include ANSI color codes in pretty output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Converts this section into the subscriber settings for `service_name`.
    #[must_use]
    pub fn to_log_config(&self, service_name: &str) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            json_format: self.format == LogFormat::Json,
            ansi: self.ansi_enabled,
            file_line_info: self.include_location,
            ..LogConfig::default()
        }
        .with_service_name(service_name)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Dispatch section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Seed every new context with the `RunMode` and `DevMode` render args.
    #[serde(default = "default_true")]
    pub publish_run_mode: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            publish_run_mode: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_defaults() {
        let app = AppConfig::default();
        assert_eq!(app.name, "keystone-app");
        assert_eq!(app.run_mode, "dev");
        assert!(app.dev_mode);
        assert_eq!(app.default_format, "html");
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let app: AppConfig = toml::from_str(r#"run_mode = "prod""#).unwrap();
        assert_eq!(app.run_mode, "prod");
        assert_eq!(app.name, "keystone-app");
        assert!(app.dev_mode);
    }

    #[test]
    fn test_log_format_lowercase() {
        let logging: LoggingConfig = toml::from_str(r#"format = "pretty""#).unwrap();
        assert_eq!(logging.format, LogFormat::Pretty);
        assert!(toml::from_str::<LoggingConfig>(r#"format = "xml""#).is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(toml::from_str::<DispatchConfig>("publish_everything = true").is_err());
    }

    #[test]
    fn test_to_log_config() {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            ansi_enabled: true,
            include_location: true,
            ..Default::default()
        };
        let log = logging.to_log_config("blog");
        assert!(!log.json_format);
        assert!(log.ansi);
        assert!(log.file_line_info);
        assert_eq!(log.level, "debug");
        assert_eq!(log.service_name, "blog");
    }
}
