//! Configuration loader with a layered approach.
//!
//! Layers are applied in order, later ones overriding earlier ones field by
//! field:
//! 1. Defaults or a preset
//! 2. Configuration files and strings (TOML or JSON)
//! 3. Environment variables (`PREFIX__SECTION__KEY`)

use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::{ConfigError, KeystoneConfig, LogFormat};

/// Configuration loader.
///
/// # Example
///
/// ```no_run
/// use keystone_config::ConfigLoader;
///
/// # fn main() -> Result<(), keystone_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_development()
///     .with_optional_file("keystone.toml")?
///     .with_env_prefix("KEYSTONE")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: KeystoneConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new loader starting from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: KeystoneConfig::default(),
            env_prefix: None,
        }
    }

    /// Start from the default configuration.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = KeystoneConfig::default();
        self
    }

    /// Start from the development preset.
    ///
    /// # Example
    ///
    /// ```
    /// use keystone_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = KeystoneConfig::development();
        self
    }

    /// Start from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = KeystoneConfig::production();
        self
    }

    /// Overlay a configuration file.
    ///
    /// The format is chosen by extension: `.toml` or `.json`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, in an
    /// unsupported format, malformed, or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let overlay = parse_layer(&content, extension)?;
        self.merge_layer(overlay)?;

        Ok(self)
    }

    /// Overlay a configuration file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Overlay configuration held in a string.
    ///
    /// `format` is "toml" or "json".
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use keystone_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[app]\nrun_mode = \"prod\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.app.run_mode, "prod");
    /// assert_eq!(config.app.name, "keystone-app");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let overlay = parse_layer(content, format)?;
        self.merge_layer(overlay)?;
        Ok(self)
    }

    /// Set the environment variable prefix for overrides.
    ///
    /// With prefix "KEYSTONE":
    /// - `KEYSTONE__APP__RUN_MODE=prod`
    /// - `KEYSTONE__LOGGING__LEVEL=debug`
    /// - `KEYSTONE__DISPATCH__PUBLISH_RUN_MODE=false`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load `.env` from the current directory into the process environment.
    ///
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the given env file into the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file is missing or malformed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref())?;
        Ok(self)
    }

    /// Apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment value does not parse or the
    /// result fails validation.
    pub fn load(mut self) -> Result<KeystoneConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Return the configuration without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> KeystoneConfig {
        self.config
    }

    fn merge_layer(&mut self, overlay: Value) -> Result<(), ConfigError> {
        let mut merged = serde_json::to_value(&self.config)?;
        merge_values(&mut merged, overlay);
        self.config = serde_json::from_value(merged)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let scope = format!("{prefix}__");
        let mut vars: Vec<(String, String)> =
            env::vars().filter(|(k, _)| k.starts_with(&scope)).collect();
        vars.sort();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();
        let expect_bool = || {
            parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
        };

        match parts.as_slice() {
            ["APP", "NAME"] => self.config.app.name = value.to_string(),
            ["APP", "RUN_MODE"] => self.config.app.run_mode = value.to_string(),
            ["APP", "DEV_MODE"] => self.config.app.dev_mode = expect_bool()?,
            ["APP", "DEFAULT_FORMAT"] => self.config.app.default_format = value.to_string(),

            ["LOGGING", "ENABLED"] => self.config.logging.enabled = expect_bool()?,
            ["LOGGING", "LEVEL"] => self.config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "ANSI_ENABLED"] => self.config.logging.ansi_enabled = expect_bool()?,
            ["LOGGING", "INCLUDE_LOCATION"] => {
                self.config.logging.include_location = expect_bool()?;
            }

            ["DISPATCH", "PUBLISH_RUN_MODE"] => {
                self.config.dispatch.publish_run_mode = expect_bool()?;
            }

            // Unknown keys are ignored.
            _ => {}
        }

        Ok(())
    }
}

fn parse_layer(content: &str, format: &str) -> Result<Value, ConfigError> {
    match format.to_lowercase().as_str() {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::unsupported_format(other)),
    }
}

/// Recursively overlays `overlay` onto `base`. Tables merge; everything else replaces.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
