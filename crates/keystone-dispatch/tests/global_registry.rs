//! Process-wide registry installation.
//!
//! Kept in its own test binary: the global registry can be installed only
//! once per process.

use keystone_core::{
    ActionDescriptor, Composite, ContextSlot, ControllerContext, FieldLayout, FieldMut,
    RequestInfo, TypeLayout,
};
use keystone_dispatch::{ControllerRegistry, Dispatcher, RegistrationError, RegistryBuilder};

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

#[test]
fn test_install_once() {
    assert!(ControllerRegistry::global().is_none());
    assert!(Dispatcher::global().is_none());

    let mut builder = RegistryBuilder::new();
    builder
        .register::<Home>("Home", vec![ActionDescriptor::new("Index")])
        .expect("registration should succeed");
    let installed = builder.build().install().expect("first install");
    assert_eq!(installed.len(), 1);

    let global = ControllerRegistry::global().expect("registry should be installed");
    assert!(global.contains("home"));

    let dispatcher = Dispatcher::global().expect("dispatcher over the global registry");
    let ctx = ControllerContext::new(RequestInfo::default()).into_ref();
    assert!(dispatcher.dispatch("HOME", "index", ctx).is_ok());

    let err = RegistryBuilder::new().build().install().unwrap_err();
    assert!(matches!(err, RegistrationError::AlreadyInstalled));
}
