//! Registration error types.

use keystone_core::{CompositionPath, KeystoneError};
use thiserror::Error;

/// Errors raised while registering controllers.
///
/// All of these are startup configuration errors: a controller that fails
/// registration must not be served.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The controller embeds no context slot anywhere in its composition graph.
    #[error("controller {controller} ({type_name}) does not embed a controller context")]
    NoContextHolder {
        /// The controller name.
        controller: String,
        /// The Rust type registered under that name.
        type_name: &'static str,
    },

    /// The composition graph embeds a type inside itself.
    #[error("controller {controller} embeds {type_name} recursively at path {path}")]
    CompositionCycle {
        /// The controller name.
        controller: String,
        /// The type that closes the cycle.
        type_name: &'static str,
        /// Path at which the recursive embedding was found.
        path: CompositionPath,
    },

    /// A discovered path does not lead to a context slot on a real instance.
    #[error("controller {controller}: composition path {path} does not resolve to a context slot (failed at depth {depth})")]
    InvalidCompositionPath {
        /// The controller name.
        controller: String,
        /// The path that failed.
        path: CompositionPath,
        /// Number of hops walked before the failure.
        depth: usize,
    },

    /// Two actions fold to the same lookup key.
    #[error("controller {controller} declares action {action} more than once")]
    DuplicateAction {
        /// The controller name.
        controller: String,
        /// The later of the clashing action names.
        action: String,
    },

    /// A registry has already been installed for this process.
    #[error("a controller registry is already installed")]
    AlreadyInstalled,
}

impl RegistrationError {
    /// Returns the controller the error is about, if any.
    #[must_use]
    pub fn controller(&self) -> Option<&str> {
        match self {
            Self::NoContextHolder { controller, .. }
            | Self::CompositionCycle { controller, .. }
            | Self::InvalidCompositionPath { controller, .. }
            | Self::DuplicateAction { controller, .. } => Some(controller),
            Self::AlreadyInstalled => None,
        }
    }
}

impl From<RegistrationError> for KeystoneError {
    fn from(err: RegistrationError) -> Self {
        let controller = err.controller().unwrap_or("<registry>").to_string();
        Self::configuration(controller, err.to_string())
    }
}
