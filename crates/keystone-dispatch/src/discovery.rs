//! Composition path discovery.
//!
//! Finds every position in a controller's composition graph where a
//! [`ContextSlot`](keystone_core::ContextSlot) is embedded. Embedded
//! composites may themselves embed further composites, so the graph is walked
//! breadth-first from the root. The order of the returned paths is the
//! breadth-first discovery order and is what injection follows.
//!
//! ```text
//!            Admin
//!        ┌─────┴──────┐
//!   [0] ctx      [1] Auth (boxed)
//!                     │
//!                [0] ctx
//!
//!   => [0], [1.0]
//! ```

use std::any::TypeId;
use std::collections::VecDeque;

use keystone_core::{CompositionPath, FieldKind, TypeLayout};
use thiserror::Error;
use tracing::trace;

/// Errors found while walking a composition graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// A type embeds itself, directly or through its descendants.
    #[error("{type_name} is embedded inside itself at path {path}")]
    Cycle {
        /// The type that closes the cycle.
        type_name: &'static str,
        /// Path of the recursive embedding.
        path: CompositionPath,
    },
}

struct Node {
    layout: TypeLayout,
    path: CompositionPath,
    ancestors: Vec<TypeId>,
}

/// Returns the path to every embedded context slot reachable from `root`.
///
/// Named fields are ignored. An empty result means the type does not
/// participate in context injection at all.
///
/// # Errors
///
/// Returns [`DiscoveryError::Cycle`] if a type is embedded along its own
/// ancestor chain. Types are compared by [`TypeLayout::type_id`], so
/// distinct types sharing a display name never collide.
pub fn discover_context_paths(root: &TypeLayout) -> Result<Vec<CompositionPath>, DiscoveryError> {
    let mut paths = Vec::new();
    let mut queue = VecDeque::from([Node {
        layout: root.clone(),
        path: CompositionPath::root(),
        ancestors: vec![root.type_id()],
    }]);

    while let Some(node) = queue.pop_front() {
        for (index, field) in node.layout.fields().iter().enumerate() {
            match field.kind() {
                FieldKind::Named => {}
                FieldKind::EmbeddedContext => {
                    let path = node.path.child(index);
                    trace!(type_name = node.layout.name(), %path, "Found embedded context");
                    paths.push(path);
                }
                FieldKind::Embedded { layout, indirect } => {
                    let embedded = layout();
                    let path = node.path.child(index);
                    if node.ancestors.contains(&embedded.type_id()) {
                        return Err(DiscoveryError::Cycle {
                            type_name: embedded.name(),
                            path,
                        });
                    }

                    trace!(
                        parent = node.layout.name(),
                        embedded = embedded.name(),
                        indirect,
                        "Following embedded composite"
                    );

                    let mut ancestors = node.ancestors.clone();
                    ancestors.push(embedded.type_id());
                    queue.push_back(Node {
                        layout: embedded,
                        path,
                        ancestors,
                    });
                }
            }
        }
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_core::FieldLayout;

    enum Base {}
    enum Middle {}
    enum Looped {}
    enum Root {}

    mod shared {
        pub enum Base {}
    }

    fn base() -> TypeLayout {
        TypeLayout::of::<Base>("Base")
            .field(FieldLayout::named("flag"))
            .field(FieldLayout::embedded_context("ctx"))
    }

    fn middle() -> TypeLayout {
        TypeLayout::of::<Middle>("Middle")
            .field(FieldLayout::named("name"))
            .field(FieldLayout::embedded_boxed("base", base))
    }

    fn looped() -> TypeLayout {
        TypeLayout::of::<Looped>("Looped").field(FieldLayout::embedded_boxed("again", looped))
    }

    fn shared_base() -> TypeLayout {
        TypeLayout::of::<shared::Base>("Base").field(FieldLayout::embedded_context("ctx"))
    }

    fn paths_of(layout: &TypeLayout) -> Vec<String> {
        discover_context_paths(layout)
            .expect("discovery should succeed")
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_direct_embedding() {
        let layout = TypeLayout::of::<Root>("Home").field(FieldLayout::embedded_context("ctx"));
        assert_eq!(paths_of(&layout), vec!["0"]);
    }

    #[test]
    fn test_named_fields_are_ignored() {
        let layout = TypeLayout::of::<Root>("Plain")
            .field(FieldLayout::named("ctx"))
            .field(FieldLayout::named("other"));
        assert!(paths_of(&layout).is_empty());
    }

    #[test]
    fn test_two_level_embedding() {
        let layout = TypeLayout::of::<Root>("Users")
            .field(FieldLayout::named("page"))
            .field(FieldLayout::embedded("base", base));
        assert_eq!(paths_of(&layout), vec!["1.1"]);
    }

    #[test]
    fn test_breadth_first_order() {
        // The deep path is declared first but the shallow one is found first.
        let layout = TypeLayout::of::<Root>("Admin")
            .field(FieldLayout::embedded("middle", middle))
            .field(FieldLayout::embedded_context("ctx"))
            .field(FieldLayout::embedded("base", base));
        assert_eq!(paths_of(&layout), vec!["1", "2.1", "0.1.1"]);
    }

    #[test]
    fn test_shared_type_in_sibling_branches_is_not_a_cycle() {
        let layout = TypeLayout::of::<Root>("Twin")
            .field(FieldLayout::embedded("left", base))
            .field(FieldLayout::embedded_boxed("right", base));
        assert_eq!(paths_of(&layout), vec!["0.1", "1.1"]);
    }

    #[test]
    fn test_distinct_types_sharing_a_name_are_not_a_cycle() {
        let layout = TypeLayout::of::<Base>("Base")
            .field(FieldLayout::embedded_context("ctx"))
            .field(FieldLayout::embedded("inner", shared_base));
        assert_eq!(paths_of(&layout), vec!["0", "1.0"]);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let err = discover_context_paths(&looped()).unwrap_err();
        assert_eq!(
            err,
            DiscoveryError::Cycle {
                type_name: "Looped",
                path: CompositionPath::from(vec![0]),
            }
        );
    }
}
