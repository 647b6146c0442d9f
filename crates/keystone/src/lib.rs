//! # Keystone
//!
//! **Action dispatch and controller composition for web applications**
//!
//! Keystone maps a request's `controller.action` pair onto a freshly built
//! controller value and gives that controller access to the per-request
//! context through composition:
//!
//! - **Case-insensitive routing targets** – `users.show` finds `Users.Show`
//! - **Composable controllers** – embed the context directly or through any
//!   number of shared base controllers
//! - **Call-site render args** – values passed to `render` are named by the
//!   line the call was written on
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use keystone::prelude::*;
//!
//! let app = Application::builder()
//!     .config(KeystoneConfig::development())
//!     .init_logging(true)
//!     .controller::<Users>("Users", vec![ActionDescriptor::new("Show").render_site(42, ["user"])])
//!     .build()?;
//!
//! let prepared = app.dispatch("users", "show", app.request(Method::GET, "/users/7"))?;
//! ```
//!
//! ## Request flow
//!
//! ```text
//! (controller, action) → Registry lookup → Action lookup → Context bound
//!                                                             ↓
//!        render(values) ← Controller instance ← Context injected at every path
//! ```

#![doc(html_root_url = "https://docs.rs/keystone/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod error;

pub use app::{Application, ApplicationBuilder, DEV_MODE_ARG, RUN_MODE_ARG};
pub use error::ApplicationError;

/// Core types: context, composition model, descriptors, render binding.
pub use keystone_core as core;

/// Registry, discovery, instantiation and dispatch.
pub use keystone_dispatch as dispatch;

/// Layered configuration.
pub use keystone_config as config;

/// Logging setup.
pub use keystone_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// ```rust
/// use keystone::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{Application, ApplicationBuilder, ApplicationError};

    pub use keystone_core::{
        ActionDescriptor, ArgumentDescriptor, CallSite, Composite, ContextRef, ContextSlot,
        ControllerContext, ErrorPage, FieldLayout, FieldMut, KeystoneError, KeystoneResult,
        RenderTemplate, RequestInfo, TypeLayout,
    };

    pub use keystone_dispatch::{Dispatcher, PreparedAction, RegistryBuilder};

    pub use keystone_config::{ConfigLoader, KeystoneConfig};

    pub use http::Method;
}
