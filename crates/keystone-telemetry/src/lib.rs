//! Logging setup for Keystone services.
//!
//! Keystone logs through `tracing` everywhere. This crate installs the
//! process-wide subscriber:
//!
//! - [`init_logging`] - `EnvFilter` plus a JSON or pretty `fmt` layer
//! - [`create_env_filter`] - Parses a filter directive
//!
//! ```text
//!   keystone-core ─────┐
//!   keystone-dispatch ─┼──► tracing ──► EnvFilter ──► fmt (json | pretty) ──► stdout
//!   keystone ──────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/keystone-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
