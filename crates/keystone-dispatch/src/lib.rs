//! # Keystone Dispatch
//!
//! Controller registration and action dispatch for Keystone.
//!
//! - [`discover_context_paths`] - Breadth-first search for embedded context slots
//! - [`RegistryBuilder`] / [`ControllerRegistry`] - Two-phase controller registration
//! - [`instantiate`] - Fresh controller per request with the context injected
//! - [`Dispatcher`] - Resolves `controller.action` and prepares the controller
//!
//! Registration happens once, before serving. After
//! [`RegistryBuilder::build`] the registry is immutable and every request
//! reads it concurrently.

#![doc(html_root_url = "https://docs.rs/keystone-dispatch/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod discovery;
mod error;
pub mod instance;
pub mod registry;
pub mod resolver;

pub use discovery::{discover_context_paths, DiscoveryError};
pub use error::RegistrationError;
pub use instance::{instantiate, HandlerInstance};
pub use registry::{ControllerRegistry, RegistryBuilder};
pub use resolver::{Dispatcher, PreparedAction};
