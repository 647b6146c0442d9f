//! Main configuration types.
//!
//! This module provides the top-level [`KeystoneConfig`] struct and its builder.

use serde::{Deserialize, Serialize};

use crate::{AppConfig, ConfigError, DispatchConfig, LogFormat, LoggingConfig};

/// Complete Keystone configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use keystone_config::KeystoneConfig;
///
/// let config = KeystoneConfig::default();
/// assert_eq!(config.app.run_mode, "dev");
/// assert!(config.dispatch.publish_run_mode);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct KeystoneConfig {
    /// Application settings.
    #[serde(default)]
    pub app: AppConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl KeystoneConfig {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```
    /// use keystone_config::{AppConfig, KeystoneConfig};
    ///
    /// let config = KeystoneConfig::builder()
    ///     .app(AppConfig {
    ///         name: "blog".to_string(),
    ///         ..Default::default()
    ///     })
    ///     .build();
    ///
    /// assert_eq!(config.app.name, "blog");
    /// ```
    #[must_use]
    pub fn builder() -> KeystoneConfigBuilder {
        KeystoneConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if:
    /// - The application name or run mode is empty
    /// - The default format is empty or not alphanumeric
    /// - Logging is enabled with a filter directive that does not parse
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app.name.trim().is_empty() {
            return Err(ConfigError::invalid_value("app.name", "must not be empty"));
        }

        if self.app.run_mode.trim().is_empty() {
            return Err(ConfigError::invalid_value("app.run_mode", "must not be empty"));
        }

        // Used verbatim as the template extension.
        let format = &self.app.default_format;
        if format.is_empty() || !format.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::invalid_value(
                "app.default_format",
                format!("expected a bare extension such as \"html\", got {format:?}"),
            ));
        }

        if self.logging.enabled {
            keystone_telemetry::create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// - Run mode `dev` with `DevMode` published
    /// - Pretty, coloured debug logs with source locations
    ///
    /// # Example
    ///
    /// ```
    /// use keystone_config::KeystoneConfig;
    ///
    /// let config = KeystoneConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.app.run_mode = "dev".to_string();
        config.app.dev_mode = true;

        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config.logging.include_location = true;

        config
    }

    /// Create a production configuration preset.
    ///
    /// - Run mode `prod` with dev mode off
    /// - JSON info logs
    ///
    /// # Example
    ///
    /// ```
    /// use keystone_config::KeystoneConfig;
    ///
    /// let config = KeystoneConfig::production();
    /// assert_eq!(config.logging.format, keystone_config::LogFormat::Json);
    /// assert!(!config.app.dev_mode);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.app.run_mode = "prod".to_string();
        config.app.dev_mode = false;

        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi_enabled = false;

        config
    }
}

/// Builder for [`KeystoneConfig`].
#[derive(Debug, Default)]
pub struct KeystoneConfigBuilder {
    app: Option<AppConfig>,
    logging: Option<LoggingConfig>,
    dispatch: Option<DispatchConfig>,
}

impl KeystoneConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application section.
    #[must_use]
    pub fn app(mut self, app: AppConfig) -> Self {
        self.app = Some(app);
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Set the dispatch section.
    #[must_use]
    pub fn dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Build the configuration. Unset sections use their defaults.
    #[must_use]
    pub fn build(self) -> KeystoneConfig {
        KeystoneConfig {
            app: self.app.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
            dispatch: self.dispatch.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<KeystoneConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KeystoneConfig::default();
        assert_eq!(config.app.name, "keystone-app");
        assert_eq!(config.app.default_format, "html");
        assert!(config.logging.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_sections() {
        let config = KeystoneConfig::builder()
            .app(AppConfig {
                name: "blog".to_string(),
                ..Default::default()
            })
            .dispatch(DispatchConfig {
                publish_run_mode: false,
            })
            .build();

        assert_eq!(config.app.name, "blog");
        assert!(!config.dispatch.publish_run_mode);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_validate_empty_name() {
        let config = KeystoneConfig::builder()
            .app(AppConfig {
                name: "  ".to_string(),
                ..Default::default()
            })
            .build();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("app.name"));
    }

    #[test]
    fn test_validate_empty_run_mode() {
        let config = KeystoneConfig::builder()
            .app(AppConfig {
                run_mode: String::new(),
                ..Default::default()
            })
            .build();

        assert!(config.validate().unwrap_err().to_string().contains("run_mode"));
    }

    #[test]
    fn test_validate_default_format() {
        let config = KeystoneConfig::builder()
            .app(AppConfig {
                default_format: ".html".to_string(),
                ..Default::default()
            })
            .build();

        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("default_format"));
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = KeystoneConfig::default();
        config.logging.level = "keystone=loud".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("logging.level"));

        config.logging.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_development_preset() {
        let config = KeystoneConfig::development();
        assert_eq!(config.app.run_mode, "dev");
        assert!(config.app.dev_mode);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.logging.ansi_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_preset() {
        let config = KeystoneConfig::production();
        assert_eq!(config.app.run_mode, "prod");
        assert!(!config.app.dev_mode);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(!config.logging.ansi_enabled);
    }

    #[test]
    fn test_build_validated() {
        assert!(KeystoneConfig::builder().build_validated().is_ok());
        let result = KeystoneConfig::builder()
            .app(AppConfig {
                name: String::new(),
                ..Default::default()
            })
            .build_validated();
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&KeystoneConfig::default()).unwrap();
        assert!(toml_str.contains("[app]"));
        assert!(toml_str.contains("[logging]"));
        assert!(toml_str.contains("[dispatch]"));
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result: Result<KeystoneConfig, _> = toml::from_str("[server]\nport = 80\n");
        assert!(result.is_err());
    }
}
