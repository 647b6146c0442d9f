//! Typed configuration for Keystone applications.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! The root type is [`KeystoneConfig`]:
//!
//! - [`AppConfig`] - Application name, run mode, dev mode, default format
//! - [`LoggingConfig`] - Log level and output format
//! - [`DispatchConfig`] - Render defaults published on each request
//!
//! # Example
//!
//! ```no_run
//! use keystone_config::ConfigLoader;
//!
//! # fn main() -> Result<(), keystone_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()?
//!     .with_file("keystone.toml")?
//!     .with_env_prefix("KEYSTONE")
//!     .load()?;
//!
//! println!("Running {} in {} mode", config.app.name, config.app.run_mode);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [app]
//! name = "blog"
//! run_mode = "prod"
//! dev_mode = false
//! default_format = "html"
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//!
//! [dispatch]
//! publish_run_mode = true
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `PREFIX__SECTION__KEY` variables:
//!
//! - `KEYSTONE__APP__RUN_MODE=prod`
//! - `KEYSTONE__LOGGING__FORMAT=pretty`

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{KeystoneConfig, KeystoneConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{AppConfig, DispatchConfig, LogFormat, LoggingConfig};
