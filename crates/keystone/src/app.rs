//! Application bootstrap.
//!
//! [`Application`] ties configuration, logging, the controller registry and
//! the dispatcher together. Build it once at start-up, then call
//! [`Application::dispatch`] for every request.

use std::sync::Arc;

use http::Method;
use keystone_config::KeystoneConfig;
use keystone_core::{
    ActionDescriptor, Composite, ContextRef, ControllerContext, KeystoneResult, RequestInfo,
};
use keystone_dispatch::{
    ControllerRegistry, Dispatcher, PreparedAction, RegistrationError, RegistryBuilder,
};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::ApplicationError;

/// Render arg holding the configured run mode.
pub const RUN_MODE_ARG: &str = "RunMode";

/// Render arg holding the configured dev-mode flag.
pub const DEV_MODE_ARG: &str = "DevMode";

/// A configured application ready to serve requests.
///
/// Cheap to clone; clones share the registry.
///
/// # Example
///
/// ```
/// use keystone::prelude::*;
///
/// #[derive(Default)]
/// struct Home {
///     ctx: ContextSlot,
/// }
///
/// impl Composite for Home {
///     fn layout() -> TypeLayout {
///         TypeLayout::of::<Self>("Home").field(FieldLayout::embedded_context("ctx"))
///     }
///
///     fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>> {
///         match index {
///             0 => Some(FieldMut::Context(&mut self.ctx)),
///             _ => None,
///         }
///     }
/// }
///
/// let app = Application::builder()
///     .controller::<Home>("Home", vec![ActionDescriptor::new("Index")])
///     .build()?;
///
/// let prepared = app.dispatch("home", "index", RequestInfo::default())?;
/// assert_eq!(prepared.full_name(), "Home.Index");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Application {
    config: Arc<KeystoneConfig>,
    dispatcher: Dispatcher,
}

impl Application {
    /// Creates a new application builder.
    #[must_use]
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &KeystoneConfig {
        &self.config
    }

    /// Returns the dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Returns the controller registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ControllerRegistry> {
        self.dispatcher.registry()
    }

    /// Describes a request using the configured default format.
    #[must_use]
    pub fn request(&self, method: Method, path: impl Into<String>) -> RequestInfo {
        RequestInfo::new(method, path).with_format(self.config.app.default_format.clone())
    }

    /// Creates the context for one request.
    ///
    /// When `dispatch.publish_run_mode` is set, the context starts with the
    /// `RunMode` and `DevMode` render args.
    #[must_use]
    pub fn new_context(&self, request: RequestInfo) -> ContextRef {
        let ctx = ControllerContext::new(request);
        let ctx = if self.config.dispatch.publish_run_mode {
            ctx.with_render_arg(RUN_MODE_ARG, json!(self.config.app.run_mode))
                .with_render_arg(DEV_MODE_ARG, json!(self.config.app.dev_mode))
        } else {
            ctx
        };
        ctx.into_ref()
    }

    /// Prepares `controller.action` for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoneError::UnknownController`](keystone_core::KeystoneError::UnknownController)
    /// or [`KeystoneError::UnknownAction`](keystone_core::KeystoneError::UnknownAction)
    /// when the names do not resolve, and
    /// [`KeystoneError::Internal`](keystone_core::KeystoneError::Internal) if the
    /// controller cannot be built.
    pub fn dispatch(
        &self,
        controller: &str,
        action: &str,
        request: RequestInfo,
    ) -> KeystoneResult<PreparedAction> {
        let ctx = self.new_context(request);
        let request_id = ctx.request_id();

        let result = self.dispatcher.dispatch(controller, action, ctx);
        if let Err(err) = &result {
            if err.is_not_found() {
                debug!(%request_id, controller, action, error = %err, "No route to action");
            } else {
                warn!(%request_id, controller, action, error = %err, "Dispatch failed");
            }
        }
        result
    }
}

/// Builder for [`Application`].
#[derive(Debug, Default)]
pub struct ApplicationBuilder {
    config: Option<KeystoneConfig>,
    init_logging: bool,
    install_global: bool,
    registry: RegistryBuilder,
    first_error: Option<RegistrationError>,
}

impl ApplicationBuilder {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: KeystoneConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Installs the global log subscriber from `config.logging` on build.
    #[must_use]
    pub fn init_logging(mut self, enabled: bool) -> Self {
        self.init_logging = enabled;
        self
    }

    /// Publishes the registry process-wide on build.
    #[must_use]
    pub fn install_global(mut self, enabled: bool) -> Self {
        self.install_global = enabled;
        self
    }

    /// Registers the controller type `T` under `name`.
    ///
    /// Registration errors are reported by [`Self::build`].
    #[must_use]
    pub fn controller<T: Composite + Default>(
        mut self,
        name: impl Into<String>,
        actions: Vec<ActionDescriptor>,
    ) -> Self {
        if self.first_error.is_none() {
            if let Err(err) = self.registry.register::<T>(name, actions) {
                self.first_error = Some(err);
            }
        }
        self
    }

    /// Validates the configuration, initializes logging if requested and
    /// freezes the registry.
    ///
    /// # Errors
    ///
    /// Returns the first registration error, a configuration validation
    /// error, or a logging initialization error.
    pub fn build(self) -> Result<Application, ApplicationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        if self.init_logging {
            keystone_telemetry::init_logging(&config.logging.to_log_config(&config.app.name))?;
        }

        if let Some(err) = self.first_error {
            return Err(err.into());
        }

        let registry = self.registry.build();
        let registry = if self.install_global {
            registry.install()?
        } else {
            Arc::new(registry)
        };

        info!(
            app = %config.app.name,
            run_mode = %config.app.run_mode,
            controllers = registry.len(),
            "Application ready"
        );

        Ok(Application {
            config: Arc::new(config),
            dispatcher: Dispatcher::new(registry),
        })
    }
}
