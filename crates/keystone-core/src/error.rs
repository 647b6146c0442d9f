//! Error types for Keystone.
//!
//! This module provides the [`KeystoneError`] type, the error surfaced to the
//! request boundary by dispatch and rendering.
//!
//! # Taxonomy
//!
//! | `ErrorCategory` | Raised when | HTTP status |
//! |---|---|---|
//! | `NotFound` | controller or action name does not resolve | 404 |
//! | `Configuration` | a controller violates the composition contract at startup | 500 |
//! | `Internal` | an internal-consistency invariant is broken | 500 |
//!
//! Render-binding anomalies are deliberately absent: they are recovered and
//! reported through `tracing`, never returned.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`KeystoneError`].
pub type KeystoneResult<T> = Result<T, KeystoneError>;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The requested controller or action does not exist.
    NotFound,
    /// Startup configuration error (invalid controller registration).
    Configuration,
    /// Internal consistency error.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Configuration | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Standard error type for Keystone.
///
/// # Example
///
/// ```
/// use keystone_core::{ErrorCategory, KeystoneError};
///
/// let err = KeystoneError::unknown_controller("Missing");
/// assert_eq!(err.category(), ErrorCategory::NotFound);
/// assert_eq!(err.status_code().as_u16(), 404);
/// ```
#[derive(Error, Debug)]
pub enum KeystoneError {
    /// No controller is registered under the requested name.
    #[error("failed to find controller {name}")]
    UnknownController {
        /// The controller name as requested.
        name: String,
    },

    /// The controller exists but has no action with the requested name.
    #[error("failed to find action {action} on controller {controller}")]
    UnknownAction {
        /// The controller name as requested.
        controller: String,
        /// The action name as requested.
        action: String,
    },

    /// A controller registration violated the composition contract.
    #[error("invalid controller configuration for {controller}: {message}")]
    Configuration {
        /// The controller being registered.
        controller: String,
        /// What was wrong with it.
        message: String,
    },

    /// Internal consistency error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl KeystoneError {
    /// Creates an unknown controller error.
    #[must_use]
    pub fn unknown_controller(name: impl Into<String>) -> Self {
        Self::UnknownController { name: name.into() }
    }

    /// Creates an unknown action error.
    #[must_use]
    pub fn unknown_action(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self::UnknownAction {
            controller: controller.into(),
            action: action.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(controller: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            controller: controller.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownController { .. } | Self::UnknownAction { .. } => ErrorCategory::NotFound,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Returns `true` if the request boundary should answer with a 404-class response.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.category(), ErrorCategory::NotFound)
    }

    /// Converts this error to a serializable error envelope.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                category: self.category(),
                details: self.error_details(),
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    const fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownController { .. } => "UNKNOWN_CONTROLLER",
            Self::UnknownAction { .. } => "UNKNOWN_ACTION",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::UnknownController { name } => Some(serde_json::json!({ "controller": name })),
            Self::UnknownAction { controller, action } => Some(serde_json::json!({
                "controller": controller,
                "action": action
            })),
            _ => None,
        }
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_controller() {
        let error = KeystoneError::unknown_controller("Missing");
        assert_eq!(error.category(), ErrorCategory::NotFound);
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert!(error.is_not_found());
        assert!(error.to_string().contains("Missing"));
    }

    #[test]
    fn test_unknown_action() {
        let error = KeystoneError::unknown_action("Users", "Missing");
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        let msg = error.to_string();
        assert!(msg.contains("Users"));
        assert!(msg.contains("Missing"));
    }

    #[test]
    fn test_configuration_error() {
        let error = KeystoneError::configuration("Users", "no embedded context");
        assert_eq!(error.category(), ErrorCategory::Configuration);
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_internal_with_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let error = KeystoneError::internal_with_source("injection failed", io);
        assert_eq!(error.category(), ErrorCategory::Internal);
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_error_envelope_serialization() {
        let error = KeystoneError::unknown_action("Users", "Missing");
        let envelope = error.to_envelope(Some("req-456"));

        let json = serde_json::to_string(&envelope).expect("serialization should work");
        assert!(json.contains("\"code\":\"UNKNOWN_ACTION\""));
        assert!(json.contains("\"request_id\":\"req-456\""));
        assert!(json.contains("\"category\":\"not_found\""));
        assert!(json.contains("\"action\":\"Missing\""));
    }

    #[test]
    fn test_envelope_without_details() {
        let envelope = KeystoneError::internal("x").to_envelope(None);
        assert!(envelope.error.details.is_none());
        assert!(envelope.request_id.is_none());
    }
}
