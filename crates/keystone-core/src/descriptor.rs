//! Controller and action descriptors.
//!
//! A [`TypeDescriptor`] is the registration-time description of one controller
//! type: its actions, the composition paths at which the context must be
//! injected, and the monomorphised hooks used to build a fresh instance. The
//! runtime core only ever walks these plain values.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::composite::{Composite, TypeLayout};

/// Folds a controller or action name into its lookup key.
#[must_use]
pub fn fold_case(name: &str) -> String {
    name.to_lowercase()
}

/// A type that reaches its value through one level of indirection.
///
/// Action arguments are declared through a pointer-like type and recorded by
/// their pointee, since construction always instantiates the pointee.
pub trait Indirect {
    /// The pointee type.
    type Target: ?Sized + 'static;
}

impl<T: ?Sized + 'static> Indirect for Box<T> {
    type Target = T;
}

impl<T: ?Sized + 'static> Indirect for Arc<T> {
    type Target = T;
}

impl<T: ?Sized + 'static> Indirect for Rc<T> {
    type Target = T;
}

impl<T: ?Sized + 'static> Indirect for *const T {
    type Target = T;
}

impl<T: ?Sized + 'static> Indirect for *mut T {
    type Target = T;
}

impl<T: ?Sized + 'static> Indirect for &'static T {
    type Target = T;
}

/// Runtime identity of an argument's base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgType {
    id: TypeId,
    name: &'static str,
}

impl ArgType {
    /// Returns the identity of `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Returns the type id.
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the fully qualified type name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if this is the type `T`.
    #[must_use]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

/// A declared action parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDescriptor {
    name: String,
    arg_type: ArgType,
}

impl ArgumentDescriptor {
    /// Declares a parameter through a pointer-like type, recording its pointee.
    ///
    /// ```
    /// use keystone_core::ArgumentDescriptor;
    ///
    /// let arg = ArgumentDescriptor::new::<Box<u64>>("id");
    /// assert!(arg.arg_type().is::<u64>());
    /// ```
    #[must_use]
    pub fn new<P: Indirect>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arg_type: ArgType::of::<P::Target>(),
        }
    }

    /// Declares a parameter whose type carries no indirection.
    #[must_use]
    pub fn direct<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arg_type: ArgType::of::<T>(),
        }
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the base type of the parameter.
    #[must_use]
    pub const fn arg_type(&self) -> ArgType {
        self.arg_type
    }
}

/// Description of one callable action on a controller.
///
/// # Example
///
/// ```
/// use keystone_core::{ActionDescriptor, ArgumentDescriptor};
///
/// let show = ActionDescriptor::new("ShowUser")
///     .arg(ArgumentDescriptor::direct::<u64>("id"))
///     .render_site(42, ["user"]);
///
/// assert_eq!(show.key(), "showuser");
/// assert_eq!(show.render_arg_names(42), Some(&["user".to_string()][..]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    name: String,
    key: String,
    args: Vec<ArgumentDescriptor>,
    render_arg_names: HashMap<u32, Vec<String>>,
}

impl ActionDescriptor {
    /// Creates an action with no parameters and no render call sites.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            key: fold_case(&name),
            name,
            args: Vec::new(),
            render_arg_names: HashMap::new(),
        }
    }

    /// Appends a declared parameter.
    #[must_use]
    pub fn arg(mut self, arg: ArgumentDescriptor) -> Self {
        self.args.push(arg);
        self
    }

    /// Records the names bound by the render call on `line`.
    #[must_use]
    pub fn render_site<I, S>(mut self, line: u32, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.render_arg_names
            .insert(line, names.into_iter().map(Into::into).collect());
        self
    }

    /// Returns the action name in its declared case.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the case-folded lookup key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the declared parameters in order.
    #[must_use]
    pub fn args(&self) -> &[ArgumentDescriptor] {
        &self.args
    }

    /// Returns the names registered for the render call on `line`.
    #[must_use]
    pub fn render_arg_names(&self, line: u32) -> Option<&[String]> {
        self.render_arg_names.get(&line).map(Vec::as_slice)
    }

    /// Returns the number of render call sites known for this action.
    #[must_use]
    pub fn render_site_count(&self) -> usize {
        self.render_arg_names.len()
    }

    /// Returns `true` if `name` folds to this action's key.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.key == fold_case(name)
    }
}

/// Field indices leading from a controller root to an embedded context slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CompositionPath(SmallVec<[usize; 4]>);

impl CompositionPath {
    /// The empty path, naming the root itself.
    #[must_use]
    pub fn root() -> Self {
        Self(SmallVec::new())
    }

    /// Returns this path extended by one field index.
    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Returns the field indices in order.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Returns the number of hops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the root path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<usize>> for CompositionPath {
    fn from(indices: Vec<usize>) -> Self {
        Self(SmallVec::from_vec(indices))
    }
}

impl fmt::Display for CompositionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for index in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{index}")?;
            first = false;
        }
        Ok(())
    }
}

type FactoryFn = fn() -> Box<dyn Any + Send>;
type AccessFn = for<'a> fn(&'a mut (dyn Any + Send)) -> Option<&'a mut dyn Composite>;

fn make_default<T: Composite + Default>() -> Box<dyn Any + Send> {
    Box::new(T::default())
}

fn access<T: Composite>(value: &mut (dyn Any + Send)) -> Option<&mut dyn Composite> {
    value
        .downcast_mut::<T>()
        .map(|typed| typed as &mut dyn Composite)
}

/// Registration-time description of a controller type.
///
/// Created once by the registry and immutable thereafter.
pub struct TypeDescriptor {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    layout: fn() -> TypeLayout,
    actions: Vec<Arc<ActionDescriptor>>,
    context_paths: Vec<CompositionPath>,
    factory: FactoryFn,
    accessor: AccessFn,
}

impl TypeDescriptor {
    /// Describes the controller type `T`.
    ///
    /// `context_paths` must come from composition discovery over `T::layout()`.
    #[must_use]
    pub fn new<T: Composite + Default>(
        name: impl Into<String>,
        actions: Vec<ActionDescriptor>,
        context_paths: Vec<CompositionPath>,
    ) -> Self {
        Self {
            name: name.into(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            layout: T::layout,
            actions: actions.into_iter().map(Arc::new).collect(),
            context_paths,
            factory: make_default::<T>,
            accessor: access::<T>,
        }
    }

    /// Returns the controller's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the Rust type id of the controller.
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the Rust type name of the controller.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the declared composition layout.
    #[must_use]
    pub fn layout(&self) -> TypeLayout {
        (self.layout)()
    }

    /// Returns the actions in declaration order.
    #[must_use]
    pub fn actions(&self) -> &[Arc<ActionDescriptor>] {
        &self.actions
    }

    /// Searches for an action by name, case-insensitively. First declared wins.
    #[must_use]
    pub fn action(&self, name: &str) -> Option<&Arc<ActionDescriptor>> {
        let key = fold_case(name);
        self.actions.iter().find(|action| action.key() == key)
    }

    /// Returns every composition path to an embedded context slot, in discovery order.
    #[must_use]
    pub fn context_paths(&self) -> &[CompositionPath] {
        &self.context_paths
    }

    /// Allocates a new default-valued controller.
    #[must_use]
    pub fn new_instance(&self) -> Box<dyn Any + Send> {
        (self.factory)()
    }

    /// Views an instance produced by [`Self::new_instance`] as a composite.
    #[must_use]
    pub fn as_composite<'a>(
        &self,
        instance: &'a mut (dyn Any + Send),
    ) -> Option<&'a mut dyn Composite> {
        (self.accessor)(instance)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field(
                "actions",
                &self.actions.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .field("context_paths", &self.context_paths)
            .finish_non_exhaustive()
    }
}
