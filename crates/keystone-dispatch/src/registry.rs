//! Controller registration.
//!
//! Registration is two-phase. During startup a [`RegistryBuilder`] collects
//! controllers and validates their composition; [`RegistryBuilder::build`]
//! then freezes the set into a [`ControllerRegistry`] that is only ever read.
//! Freezing is what makes concurrent lookups safe without locking.
//!
//! # Example
//!
//! ```
//! use keystone_core::{ActionDescriptor, Composite, ContextSlot, FieldLayout, FieldMut, TypeLayout};
//! use keystone_dispatch::RegistryBuilder;
//!
//! #[derive(Default)]
//! struct Home {
//!     ctx: ContextSlot,
//! }
//!
//! impl Composite for Home {
//!     fn layout() -> TypeLayout {
//!         TypeLayout::of::<Self>("Home").field(FieldLayout::embedded_context("ctx"))
//!     }
//!
//!     fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>> {
//!         match index {
//!             0 => Some(FieldMut::Context(&mut self.ctx)),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let mut builder = RegistryBuilder::new();
//! builder.register::<Home>("Home", vec![ActionDescriptor::new("Index")])?;
//! let registry = builder.build();
//!
//! assert!(registry.contains("home"));
//! # Ok::<(), keystone_dispatch::RegistrationError>(())
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use keystone_core::{
    fold_case, ActionDescriptor, Composite, ControllerContext, RequestInfo, TypeDescriptor,
};
use tracing::{debug, info, trace};

use crate::discovery::{discover_context_paths, DiscoveryError};
use crate::error::RegistrationError;
use crate::instance::inject_all;

static GLOBAL_REGISTRY: OnceLock<Arc<ControllerRegistry>> = OnceLock::new();

/// Collects controllers during startup.
#[derive(Default)]
pub struct RegistryBuilder {
    controllers: IndexMap<String, Arc<TypeDescriptor>>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            controllers: IndexMap::new(),
        }
    }

    /// Registers the controller type `T` under `name` with its `actions`.
    ///
    /// The name is matched case-insensitively at lookup time. Registering a
    /// second controller under a name that folds to the same key replaces the
    /// first.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistrationError`] if `T` embeds no context slot, embeds
    /// itself, declares the same action twice, or has a layout that its
    /// `field_mut` does not honour.
    pub fn register<T: Composite + Default>(
        &mut self,
        name: impl Into<String>,
        actions: Vec<ActionDescriptor>,
    ) -> Result<(), RegistrationError> {
        let name = name.into();
        let layout = T::layout();

        let context_paths = discover_context_paths(&layout).map_err(|err| match err {
            DiscoveryError::Cycle { type_name, path } => RegistrationError::CompositionCycle {
                controller: name.clone(),
                type_name,
                path,
            },
        })?;

        if context_paths.is_empty() {
            return Err(RegistrationError::NoContextHolder {
                controller: name,
                type_name: std::any::type_name::<T>(),
            });
        }

        let mut seen = HashSet::with_capacity(actions.len());
        for action in &actions {
            if !seen.insert(action.key()) {
                return Err(RegistrationError::DuplicateAction {
                    controller: name,
                    action: action.name().to_string(),
                });
            }
        }

        // Dry-run injection: every path must resolve on a real instance.
        let mut trial = T::default();
        let ctx = ControllerContext::new(RequestInfo::default()).into_ref();
        inject_all(&mut trial, &context_paths, &ctx).map_err(|failure| {
            RegistrationError::InvalidCompositionPath {
                controller: name.clone(),
                path: failure.path,
                depth: failure.depth,
            }
        })?;

        trace!(
            controller = %name,
            type_name = std::any::type_name::<T>(),
            actions = actions.len(),
            paths = ?context_paths.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Registered controller"
        );

        let key = fold_case(&name);
        let descriptor = Arc::new(TypeDescriptor::new::<T>(name, actions, context_paths));
        if let Some(previous) = self.controllers.insert(key, descriptor) {
            debug!(
                controller = previous.name(),
                previous_type = previous.type_name(),
                new_type = std::any::type_name::<T>(),
                "Replaced previously registered controller"
            );
        }

        Ok(())
    }

    /// Returns the number of registered controllers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    /// Returns `true` if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Closes registration.
    #[must_use]
    pub fn build(self) -> ControllerRegistry {
        info!(controllers = self.controllers.len(), "Controller registry built");
        ControllerRegistry {
            controllers: self.controllers,
        }
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("controllers", &self.controllers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The frozen set of controllers, keyed by case-folded name.
///
/// Immutable once built and safe to share between threads.
pub struct ControllerRegistry {
    controllers: IndexMap<String, Arc<TypeDescriptor>>,
}

impl ControllerRegistry {
    /// Publishes this registry process-wide.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::AlreadyInstalled`] on every call after the first.
    pub fn install(self) -> Result<Arc<Self>, RegistrationError> {
        let registry = Arc::new(self);
        GLOBAL_REGISTRY
            .set(Arc::clone(&registry))
            .map_err(|_| RegistrationError::AlreadyInstalled)?;
        info!(controllers = registry.len(), "Controller registry installed");
        Ok(registry)
    }

    /// Returns the process-wide registry, if one has been installed.
    #[must_use]
    pub fn global() -> Option<Arc<Self>> {
        GLOBAL_REGISTRY.get().cloned()
    }

    /// Finds a controller by name, case-insensitively.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Arc<TypeDescriptor>> {
        self.controllers.get(&fold_case(name))
    }

    /// Returns `true` if a controller is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.controllers.contains_key(&fold_case(name))
    }

    /// Returns the number of controllers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    /// Returns `true` if no controllers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Returns the display names of every controller, in registration order.
    pub fn controller_names(&self) -> impl Iterator<Item = &str> {
        self.controllers.values().map(|descriptor| descriptor.name())
    }

    /// Iterates over every descriptor, in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
        self.controllers.values()
    }
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("controllers", &self.controller_names().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_core::{CompositionPath, ContextSlot, FieldLayout, FieldMut, TypeLayout};

    #[derive(Default)]
    struct Home {
        ctx: ContextSlot,
    }

    impl Composite for Home {
        fn layout() -> TypeLayout {
            TypeLayout::of::<Self>("Home").field(FieldLayout::embedded_context("ctx"))
        }

        fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>> {
            match index {
                0 => Some(FieldMut::Context(&mut self.ctx)),
                _ => None,
            }
        }
    }

    #[derive(Default)]
    struct Other {
        ctx: ContextSlot,
    }

    impl Composite for Other {
        fn layout() -> TypeLayout {
            TypeLayout::of::<Self>("Other")
                .field(FieldLayout::named("name"))
                .field(FieldLayout::embedded_context("ctx"))
        }

        fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>> {
            match index {
                1 => Some(FieldMut::Context(&mut self.ctx)),
                _ => None,
            }
        }
    }

    #[derive(Default)]
    struct NoContext {
        count: u32,
    }

    impl Composite for NoContext {
        fn layout() -> TypeLayout {
            TypeLayout::of::<Self>("NoContext").field(FieldLayout::named("count"))
        }

        fn field_mut(&mut self, _index: usize) -> Option<FieldMut<'_>> {
            None
        }
    }

    /// Declares an embedded context its `field_mut` never exposes.
    #[derive(Default)]
    struct Liar;

    impl Composite for Liar {
        fn layout() -> TypeLayout {
            TypeLayout::of::<Self>("Liar").field(FieldLayout::embedded_context("ctx"))
        }

        fn field_mut(&mut self, _index: usize) -> Option<FieldMut<'_>> {
            None
        }
    }

    mod shared {
        use super::*;

        #[derive(Default)]
        pub struct Base {
            pub ctx: ContextSlot,
        }

        impl Composite for Base {
            fn layout() -> TypeLayout {
                TypeLayout::of::<Self>("Base").field(FieldLayout::embedded_context("ctx"))
            }

            fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>> {
                match index {
                    0 => Some(FieldMut::Context(&mut self.ctx)),
                    _ => None,
                }
            }
        }
    }

    /// Shares its display name with the type it embeds.
    #[derive(Default)]
    struct Base {
        inner: shared::Base,
    }

    impl Composite for Base {
        fn layout() -> TypeLayout {
            TypeLayout::of::<Self>("Base").field(FieldLayout::embedded("inner", shared::Base::layout))
        }

        fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>> {
            match index {
                0 => Some(FieldMut::Composite(&mut self.inner)),
                _ => None,
            }
        }
    }

    #[test]
    fn test_builder_new_is_empty() {
        let builder = RegistryBuilder::new();
        assert!(builder.is_empty());
        assert!(builder.build().is_empty());
    }

    #[test]
    fn test_register_and_lookup_case_insensitive() {
        let mut builder = RegistryBuilder::new();
        builder
            .register::<Home>("Home", vec![ActionDescriptor::new("Index")])
            .expect("registration should succeed");
        let registry = builder.build();

        for name in ["Home", "home", "HOME", "hOmE"] {
            assert!(registry.contains(name), "{name} should resolve");
        }
        let descriptor = registry.lookup("HOME").expect("should resolve");
        assert_eq!(descriptor.name(), "Home");
        assert_eq!(descriptor.context_paths()[0].to_string(), "0");
        assert!(!registry.contains("Homes"));
    }

    #[test]
    fn test_reregistration_overwrites() {
        let mut builder = RegistryBuilder::new();
        builder
            .register::<Home>("Users", vec![ActionDescriptor::new("Index")])
            .expect("first registration");
        builder
            .register::<Other>("USERS", vec![ActionDescriptor::new("Show")])
            .expect("second registration");
        let registry = builder.build();

        assert_eq!(registry.len(), 1);
        let descriptor = registry.lookup("users").expect("should resolve");
        assert_eq!(descriptor.name(), "USERS");
        assert!(descriptor.type_name().ends_with("Other"));
        assert!(descriptor.action("show").is_some());
        assert!(descriptor.action("index").is_none());
    }

    #[test]
    fn test_no_context_holder_rejected() {
        let mut builder = RegistryBuilder::new();
        let err = builder
            .register::<NoContext>("Counter", Vec::new())
            .unwrap_err();
        assert!(matches!(err, RegistrationError::NoContextHolder { .. }));
        assert!(builder.is_empty());
    }

    #[test]
    fn test_duplicate_action_rejected() {
        let mut builder = RegistryBuilder::new();
        let err = builder
            .register::<Home>(
                "Home",
                vec![ActionDescriptor::new("Index"), ActionDescriptor::new("INDEX")],
            )
            .unwrap_err();
        match err {
            RegistrationError::DuplicateAction { controller, action } => {
                assert_eq!(controller, "Home");
                assert_eq!(action, "INDEX");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unreachable_path_rejected() {
        let mut builder = RegistryBuilder::new();
        let err = builder.register::<Liar>("Liar", Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::InvalidCompositionPath { depth: 0, .. }
        ));
    }

    #[test]
    fn test_controller_names_in_registration_order() {
        let mut builder = RegistryBuilder::new();
        builder.register::<Other>("Users", Vec::new()).expect("users");
        builder.register::<Home>("Home", Vec::new()).expect("home");
        let registry = builder.build();

        let names: Vec<_> = registry.controller_names().collect();
        assert_eq!(names, vec!["Users", "Home"]);
        assert_eq!(registry.descriptors().count(), 2);
        assert!(format!("{registry:?}").contains("Users"));
    }

    #[test]
    fn test_registry_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ControllerRegistry>();
    }

    #[test]
    fn test_same_named_embedding_is_not_a_cycle() {
        let mut builder = RegistryBuilder::new();
        builder
            .register::<Base>("AdminBase", Vec::new())
            .expect("distinct types sharing a name should register");

        let registry = builder.build();
        let descriptor = registry.lookup("adminbase").expect("registered");
        assert_eq!(descriptor.context_paths(), &[CompositionPath::from(vec![0, 0])]);
    }
}
