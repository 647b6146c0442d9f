//! Controller instantiation and context injection.
//!
//! Every request gets a freshly allocated controller. The same
//! [`ContextRef`] is stored at every composition path recorded on the
//! controller's [`TypeDescriptor`], so a state change made through one
//! embedded slot is visible through all of them.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use keystone_core::{
    Composite, CompositionPath, ContextRef, FieldMut, KeystoneError, KeystoneResult,
    TypeDescriptor,
};
use tracing::{error, trace};

/// A path that could not be walked on a live instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InjectionFailure {
    pub(crate) path: CompositionPath,
    pub(crate) depth: usize,
}

/// Stores `ctx` at every path in `paths`.
pub(crate) fn inject_all(
    root: &mut dyn Composite,
    paths: &[CompositionPath],
    ctx: &ContextRef,
) -> Result<(), InjectionFailure> {
    for path in paths {
        inject_at(root, path.indices(), 0, ctx).map_err(|depth| InjectionFailure {
            path: path.clone(),
            depth,
        })?;
    }
    Ok(())
}

fn inject_at(
    node: &mut dyn Composite,
    indices: &[usize],
    depth: usize,
    ctx: &ContextRef,
) -> Result<(), usize> {
    let Some((&index, rest)) = indices.split_first() else {
        return Err(depth);
    };

    match (node.field_mut(index), rest.is_empty()) {
        (Some(FieldMut::Context(slot)), true) => {
            slot.set(Arc::clone(ctx));
            Ok(())
        }
        (Some(FieldMut::Composite(child)), false) => inject_at(child, rest, depth + 1, ctx),
        _ => Err(depth),
    }
}

/// A controller instance wired to one request's context.
pub struct HandlerInstance {
    descriptor: Arc<TypeDescriptor>,
    context: ContextRef,
    value: Box<dyn Any + Send>,
}

impl HandlerInstance {
    /// Returns the descriptor the instance was built from.
    #[must_use]
    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// Returns the context injected into the instance.
    #[must_use]
    pub fn context(&self) -> &ContextRef {
        &self.context
    }

    /// Returns the controller as `T`, if it is one.
    #[must_use]
    pub fn downcast_ref<T: Composite>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Returns the controller mutably as `T`, if it is one.
    pub fn downcast_mut<T: Composite>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut::<T>()
    }

    /// Returns the controller as a composite.
    pub fn as_composite(&mut self) -> Option<&mut dyn Composite> {
        self.descriptor.as_composite(self.value.as_mut())
    }

    /// Unwraps the controller as `T`.
    ///
    /// # Errors
    ///
    /// Returns the instance unchanged if the controller is not a `T`.
    pub fn into_inner<T: Composite>(self) -> Result<Box<T>, Self> {
        let Self {
            descriptor,
            context,
            value,
        } = self;
        value.downcast::<T>().map_err(|value| Self {
            descriptor,
            context,
            value,
        })
    }
}

impl fmt::Debug for HandlerInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerInstance")
            .field("controller", &self.descriptor.name())
            .field("request_id", &self.context.request_id())
            .finish_non_exhaustive()
    }
}

/// Builds a fresh controller for `descriptor` and injects `ctx` at every
/// composition path.
///
/// # Errors
///
/// Returns [`KeystoneError::Internal`] if a path does not resolve on the new
/// instance. Registration rejects such controllers, so this indicates a
/// `Composite` implementation whose layout and fields disagree.
pub fn instantiate(
    descriptor: &Arc<TypeDescriptor>,
    ctx: ContextRef,
) -> KeystoneResult<HandlerInstance> {
    let mut value = descriptor.new_instance();

    let Some(root) = descriptor.as_composite(value.as_mut()) else {
        error!(controller = descriptor.name(), "Factory produced a value of the wrong type");
        return Err(KeystoneError::internal(format!(
            "controller {} produced an instance of the wrong type",
            descriptor.name()
        )));
    };

    if let Err(failure) = inject_all(root, descriptor.context_paths(), &ctx) {
        error!(
            controller = descriptor.name(),
            path = %failure.path,
            depth = failure.depth,
            "Failed to inject controller context"
        );
        return Err(KeystoneError::internal(format!(
            "controller {}: composition path {} is not reachable",
            descriptor.name(),
            failure.path
        )));
    }

    trace!(
        controller = descriptor.name(),
        paths = descriptor.context_paths().len(),
        request_id = %ctx.request_id(),
        "Instantiated controller"
    );

    Ok(HandlerInstance {
        descriptor: Arc::clone(descriptor),
        context: ctx,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_core::{
        ActionDescriptor, ContextSlot, ControllerContext, FieldLayout, RequestInfo, TypeLayout,
    };

    #[derive(Debug, Default)]
    struct Base {
        ctx: ContextSlot,
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

    #[derive(Debug, Default)]
    struct Page {
        ctx: ContextSlot,
        base: Box<Base>,
        title: String,
    }

    impl Composite for Page {
        fn layout() -> TypeLayout {
            TypeLayout::of::<Self>("Page")
                .field(FieldLayout::embedded_context("ctx"))
                .field(FieldLayout::embedded_boxed("base", Base::layout))
                .field(FieldLayout::named("title"))
        }

        fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>> {
            match index {
                0 => Some(FieldMut::Context(&mut self.ctx)),
                1 => Some(FieldMut::Composite(self.base.as_mut())),
                _ => None,
            }
        }
    }

    fn page_descriptor(paths: Vec<Vec<usize>>) -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor::new::<Page>(
            "Page",
            vec![ActionDescriptor::new("Index")],
            paths.into_iter().map(CompositionPath::from).collect(),
        ))
    }

    fn new_ctx() -> ContextRef {
        ControllerContext::new(RequestInfo::default()).into_ref()
    }

    #[test]
    fn test_instantiate_injects_every_path() {
        let ctx = new_ctx();
        let instance = instantiate(&page_descriptor(vec![vec![0], vec![1, 0]]), Arc::clone(&ctx))
            .expect("instantiation should succeed");

        let page = instance.downcast_ref::<Page>().expect("should be a Page");
        assert!(page.ctx.is_set());
        assert!(page.ctx.same_as(&page.base.ctx));
        assert!(Arc::ptr_eq(page.ctx.get().expect("set"), &ctx));
        assert!(page.title.is_empty());
    }

    #[test]
    fn test_instances_are_independent() {
        let descriptor = page_descriptor(vec![vec![0], vec![1, 0]]);
        let mut first = instantiate(&descriptor, new_ctx()).expect("first");
        let second = instantiate(&descriptor, new_ctx()).expect("second");

        first.downcast_mut::<Page>().expect("Page").title = "changed".to_string();
        assert!(second.downcast_ref::<Page>().expect("Page").title.is_empty());
        assert!(!Arc::ptr_eq(first.context(), second.context()));
    }

    #[test]
    fn test_unreachable_path_is_internal_error() {
        let err = instantiate(&page_descriptor(vec![vec![2]]), new_ctx()).unwrap_err();
        assert!(matches!(err, KeystoneError::Internal { .. }));

        let too_deep = instantiate(&page_descriptor(vec![vec![0, 0]]), new_ctx()).unwrap_err();
        assert!(too_deep.to_string().contains("0.0"));
    }

    #[test]
    fn test_inject_all_reports_depth() {
        let mut page = Page::default();
        let failure = inject_all(&mut page, &[CompositionPath::from(vec![1, 5])], &new_ctx())
            .unwrap_err();
        assert_eq!(failure.depth, 1);

        let empty = inject_all(&mut page, &[CompositionPath::root()], &new_ctx()).unwrap_err();
        assert_eq!(empty.depth, 0);
    }

    #[test]
    fn test_into_inner() {
        let instance = instantiate(&page_descriptor(vec![vec![0]]), new_ctx()).expect("instance");
        let instance = instance.into_inner::<Base>().unwrap_err();
        let page = instance.into_inner::<Page>().expect("should be a Page");
        assert!(page.ctx.is_set());
        assert!(!page.base.ctx.is_set());
    }
}
