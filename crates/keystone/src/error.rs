//! Application bootstrap errors.

use keystone_config::ConfigError;
use keystone_dispatch::RegistrationError;
use keystone_telemetry::TelemetryError;
use thiserror::Error;

/// Errors raised while building an [`Application`](crate::Application).
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Logging could not be initialized.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// A controller failed registration.
    #[error("controller registration failed: {0}")]
    Registration(#[from] RegistrationError),
}
