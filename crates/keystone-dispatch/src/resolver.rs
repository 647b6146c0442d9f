//! Action resolution and request preparation.

use std::sync::Arc;

use keystone_core::{
    ActionBinding, ActionDescriptor, Composite, ContextRef, KeystoneError, KeystoneResult,
    TypeDescriptor,
};
use tracing::debug;

use crate::instance::{instantiate, HandlerInstance};
use crate::registry::ControllerRegistry;

/// Resolves requests against a frozen [`ControllerRegistry`].
///
/// Cheap to clone; clones share the registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ControllerRegistry>,
}

impl Dispatcher {
    /// Creates a dispatcher over `registry`.
    #[must_use]
    pub fn new(registry: Arc<ControllerRegistry>) -> Self {
        Self { registry }
    }

    /// Creates a dispatcher over the installed process-wide registry.
    #[must_use]
    pub fn global() -> Option<Self> {
        ControllerRegistry::global().map(Self::new)
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ControllerRegistry> {
        &self.registry
    }

    /// Finds the controller and action named by a request.
    ///
    /// Both names are matched case-insensitively. When a controller declares
    /// several actions folding to the same name, the first declared wins.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoneError::UnknownController`] or
    /// [`KeystoneError::UnknownAction`].
    pub fn resolve_action(
        &self,
        controller: &str,
        action: &str,
    ) -> KeystoneResult<(Arc<TypeDescriptor>, Arc<ActionDescriptor>)> {
        let Some(descriptor) = self.registry.lookup(controller) else {
            debug!(controller, "Controller not found");
            return Err(KeystoneError::unknown_controller(controller));
        };

        let Some(found) = descriptor.action(action) else {
            debug!(controller, action, "Action not found");
            return Err(KeystoneError::unknown_action(controller, action));
        };

        Ok((Arc::clone(descriptor), Arc::clone(found)))
    }

    /// Prepares `controller.action` to serve the request owning `ctx`.
    ///
    /// Binds the action identity into the context, then builds a fresh
    /// controller with `ctx` injected at every composition path.
    ///
    /// # Errors
    ///
    /// Returns the resolution errors of [`Self::resolve_action`], or
    /// [`KeystoneError::Internal`] if injection fails.
    pub fn dispatch(
        &self,
        controller: &str,
        action: &str,
        ctx: ContextRef,
    ) -> KeystoneResult<PreparedAction> {
        let (descriptor, action) = self.resolve_action(controller, action)?;

        ctx.bind_action(ActionBinding::new(descriptor.name(), Arc::clone(&action)));
        debug!(
            action = %format_args!("{}.{}", descriptor.name(), action.name()),
            request_id = %ctx.request_id(),
            "Dispatching action"
        );

        let instance = instantiate(&descriptor, ctx)?;
        Ok(PreparedAction { action, instance })
    }
}

/// A resolved action with its freshly built controller.
#[derive(Debug)]
pub struct PreparedAction {
    action: Arc<ActionDescriptor>,
    instance: HandlerInstance,
}

impl PreparedAction {
    /// Returns the controller descriptor.
    #[must_use]
    pub fn controller(&self) -> &Arc<TypeDescriptor> {
        self.instance.descriptor()
    }

    /// Returns the action descriptor.
    #[must_use]
    pub fn action(&self) -> &Arc<ActionDescriptor> {
        &self.action
    }

    /// Returns the request context.
    #[must_use]
    pub fn context(&self) -> &ContextRef {
        self.instance.context()
    }

    /// Returns the fully qualified action name, e.g. "Users.Show".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.controller().name(), self.action.name())
    }

    /// Returns the controller as `T`.
    #[must_use]
    pub fn controller_ref<T: Composite>(&self) -> Option<&T> {
        self.instance.downcast_ref::<T>()
    }

    /// Returns the controller mutably as `T`.
    pub fn controller_mut<T: Composite>(&mut self) -> Option<&mut T> {
        self.instance.downcast_mut::<T>()
    }

    /// Returns the controller instance.
    #[must_use]
    pub fn instance(&self) -> &HandlerInstance {
        &self.instance
    }

    /// Consumes the preparation, returning the controller instance.
    #[must_use]
    pub fn into_instance(self) -> HandlerInstance {
        self.instance
    }
}
