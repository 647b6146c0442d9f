//! # Keystone Core
//!
//! Core types for the Keystone action-dispatch framework.
//!
//! This crate provides the plain data the dispatcher walks at runtime:
//!
//! - [`ControllerContext`] - Per-request state injected into every controller
//! - [`Composite`] / [`TypeLayout`] - Declared composition shape of a controller
//! - [`TypeDescriptor`] / [`ActionDescriptor`] - Registration-time controller metadata
//! - [`bind_render_args`] - Call-site based naming of render values
//! - [`KeystoneError`] - Standard error type

#![doc(html_root_url = "https://docs.rs/keystone-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod composite;
mod context;
pub mod descriptor;
mod error;
pub mod render;

pub use composite::{Composite, ContextSlot, FieldKind, FieldLayout, FieldMut, LayoutFn, TypeLayout};
pub use context::{
    ActionBinding, ContextRef, ControllerContext, Flash, Params, RequestId, RequestInfo, Session,
};
pub use descriptor::{
    fold_case, ActionDescriptor, ArgType, ArgumentDescriptor, CompositionPath, Indirect,
    TypeDescriptor,
};
pub use error::{ErrorCategory, ErrorDetail, ErrorEnvelope, KeystoneError, KeystoneResult};
pub use render::{bind_render_args, CallSite, ErrorPage, RenderBindings, RenderTemplate};
