//! Composition model for controller types.
//!
//! Controllers gain access to the per-request [`ControllerContext`] by
//! embedding a [`ContextSlot`], either directly or through any number of
//! intermediate composites. A controller describes its shape once, through
//! [`Composite::layout`], and exposes its embedded fields by position through
//! [`Composite::field_mut`]. Discovery reads layouts; injection walks
//! `field_mut`.
//!
//! # Example
//!
//! ```
//! use keystone_core::{Composite, ContextSlot, FieldLayout, FieldMut, TypeLayout};
//!
//! #[derive(Default)]
//! struct Users {
//!     ctx: ContextSlot,
//!     page_size: usize,
//! }
//!
//! impl Composite for Users {
//!     fn layout() -> TypeLayout {
//!         TypeLayout::of::<Self>("Users")
//!             .field(FieldLayout::embedded_context("ctx"))
//!             .field(FieldLayout::named("page_size"))
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
//! assert_eq!(Users::layout().fields().len(), 2);
//! ```

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::context::{ContextRef, ControllerContext};
use crate::error::{KeystoneError, KeystoneResult};

/// Produces the layout of an embedded composite type.
pub type LayoutFn = fn() -> TypeLayout;

/// How a field participates in composition.
#[derive(Clone, Copy)]
pub enum FieldKind {
    /// An ordinary named field. Ignored by discovery.
    Named,
    /// An embedded [`ContextSlot`].
    EmbeddedContext,
    /// An embedded composite type.
    Embedded {
        /// Layout of the embedded type.
        layout: LayoutFn,
        /// Whether the embedding goes through one level of indirection (`Box<T>`).
        indirect: bool,
    },
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named => f.write_str("Named"),
            Self::EmbeddedContext => f.write_str("EmbeddedContext"),
            Self::Embedded { layout, indirect } => f
                .debug_struct("Embedded")
                .field("type", &layout().name())
                .field("indirect", indirect)
                .finish(),
        }
    }
}

/// One field of a [`TypeLayout`].
#[derive(Debug, Clone, Copy)]
pub struct FieldLayout {
    name: &'static str,
    kind: FieldKind,
}

impl FieldLayout {
    /// A plain named field.
    #[must_use]
    pub const fn named(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Named,
        }
    }

    /// An embedded context slot.
    #[must_use]
    pub const fn embedded_context(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::EmbeddedContext,
        }
    }

    /// An embedded composite held by value.
    #[must_use]
    pub const fn embedded(name: &'static str, layout: LayoutFn) -> Self {
        Self {
            name,
            kind: FieldKind::Embedded {
                layout,
                indirect: false,
            },
        }
    }

    /// An embedded composite held behind a pointer.
    #[must_use]
    pub const fn embedded_boxed(name: &'static str, layout: LayoutFn) -> Self {
        Self {
            name,
            kind: FieldKind::Embedded {
                layout,
                indirect: true,
            },
        }
    }

    /// Returns the field name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the field kind.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }
}

/// Declared shape of a composite type: its identity, its name and its fields
/// in declaration order.
#[derive(Debug, Clone)]
pub struct TypeLayout {
    type_id: TypeId,
    name: &'static str,
    fields: Vec<FieldLayout>,
}

impl TypeLayout {
    /// Starts a layout with no fields for the type `T`.
    ///
    /// `name` is for display only; two layouts describe the same type exactly
    /// when their [`type_id`](Self::type_id) matches.
    #[must_use]
    pub fn of<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name,
            fields: Vec::new(),
        }
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: FieldLayout) -> Self {
        self.fields.push(field);
        self
    }

    /// Returns the identity of the described type.
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }
}

/// The slot a controller embeds to receive the per-request context.
#[derive(Debug, Clone, Default)]
pub struct ContextSlot(Option<ContextRef>);

impl ContextSlot {
    /// Creates an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self(None)
    }

    /// Stores a reference to `ctx`.
    pub fn set(&mut self, ctx: ContextRef) {
        self.0 = Some(ctx);
    }

    /// Returns the injected context, if any.
    #[must_use]
    pub fn get(&self) -> Option<&ContextRef> {
        self.0.as_ref()
    }

    /// Returns `true` once a context has been injected.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// Returns the injected context.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoneError::Internal`] if the controller was not built by the dispatcher.
    pub fn context(&self) -> KeystoneResult<&ControllerContext> {
        self.0
            .as_deref()
            .ok_or_else(|| KeystoneError::internal("controller context was not injected"))
    }

    /// Returns `true` if both slots reference the same context.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Mutable access to an embedded field, returned by [`Composite::field_mut`].
pub enum FieldMut<'a> {
    /// The field is a context slot.
    Context(&'a mut ContextSlot),
    /// The field is another composite.
    Composite(&'a mut dyn Composite),
}

impl fmt::Debug for FieldMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Context(slot) => f.debug_tuple("Context").field(slot).finish(),
            Self::Composite(_) => f.write_str("Composite(..)"),
        }
    }
}

/// A type that can be composed into a controller.
///
/// `field_mut(i)` must return the field described by `layout().fields()[i]`
/// for every embedded field. Named fields may return `None`.
pub trait Composite: Send + 'static {
    /// Returns the declared layout of this type.
    fn layout() -> TypeLayout
    where
        Self: Sized;

    /// Returns mutable access to the embedded field at `index`.
    fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>>;
}
