//! Query tree node
//!
//! A `Node<S>` is a bag of components with at most one component per kind.
//! `S` is the caller's source handle (for example a location in an editor)
//! and is carried through untouched.

use super::components::{Component, ComponentKind, NodeComponent, COMPONENT_KINDS};
use super::errors::{MqlError, MqlResult};

/// A node of a query tree
#[derive(Debug, Clone, PartialEq)]
pub struct Node<S> {
    pub source: S,
    components: [Option<Component<S>>; COMPONENT_KINDS],
}

impl<S> Node<S> {
    /// Creates a node. A later component replaces an earlier one of the same kind.
    pub fn new(source: S, components: Vec<Component<S>>) -> Self {
        let mut node = Self {
            source,
            components: std::array::from_fn(|_| None),
        };
        for component in components {
            node.set(component);
        }
        node
    }

    /// Node with only a source
    pub fn empty(source: S) -> Self {
        Self::new(source, Vec::new())
    }

    fn set(&mut self, component: Component<S>) {
        let slot = component.kind() as usize;
        self.components[slot] = Some(component);
    }

    /// Typed component lookup
    pub fn component<C: NodeComponent<S>>(&self) -> Option<&C> {
        self.components[C::KIND as usize]
            .as_ref()
            .and_then(C::from_component)
    }

    pub fn has<C: NodeComponent<S>>(&self) -> bool {
        self.components[C::KIND as usize].is_some()
    }

    /// Component lookup for callers that know the component is present
    pub fn require<C: NodeComponent<S>>(&self) -> MqlResult<&C> {
        self.component::<C>()
            .ok_or(MqlError::MissingComponent(C::KIND.name()))
    }

    /// Returns a copy of this node with `component` added or replaced
    pub fn with<C: NodeComponent<S>>(mut self, component: C) -> Self {
        self.set(component.into_component());
        self
    }

    /// Returns a copy of this node without the component of type `C`
    pub fn without<C: NodeComponent<S>>(mut self) -> Self {
        self.components[C::KIND as usize] = None;
        self
    }

    /// Present components, in kind order
    pub fn components(&self) -> impl Iterator<Item = &Component<S>> {
        self.components.iter().flatten()
    }

    pub fn has_kind(&self, kind: ComponentKind) -> bool {
        self.components[kind as usize].is_some()
    }

    /// Children of every child-bearing component, in kind order
    pub fn children(&self) -> impl Iterator<Item = &Node<S>> {
        self.components().flat_map(|component| component.children().iter())
    }

    /// Rebuilds the tree with a different source type
    pub fn map_source<T, F: Fn(&S) -> T>(&self, f: &F) -> Node<T> {
        Node {
            source: f(&self.source),
            components: std::array::from_fn(|slot| {
                self.components[slot]
                    .as_ref()
                    .map(|component| component.map_source(f))
            }),
        }
    }

    /// Same tree without source handles
    pub fn erase_source(&self) -> Node<()> {
        self.map_source(&|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mql::components::{
        CommandType, HasFieldReference, HasFilter, HasLimit, IsCommand, Name, Named,
    };

    fn field_node(name: &str) -> Node<&'static str> {
        Node::new(
            "field",
            vec![
                Named(Name::Eq).into(),
                HasFieldReference::from_schema("field", name).into(),
            ],
        )
    }

    #[test]
    fn test_typed_lookup() {
        let node = Node::new("query", vec![IsCommand(CommandType::Find).into()]);

        assert_eq!(
            node.component::<IsCommand>(),
            Some(&IsCommand(CommandType::Find))
        );
        assert!(node.component::<HasLimit>().is_none());
        assert!(node.has::<IsCommand>());
    }

    #[test]
    fn test_one_component_per_kind() {
        let node = Node::new(
            "query",
            vec![
                IsCommand(CommandType::Find).into(),
                IsCommand(CommandType::Aggregate).into(),
            ],
        );

        assert_eq!(node.components().count(), 1);
        assert_eq!(
            node.component::<IsCommand>(),
            Some(&IsCommand(CommandType::Aggregate))
        );
    }

    #[test]
    fn test_require_missing_component() {
        let node: Node<()> = Node::empty(());
        let err = node.require::<HasLimit>().unwrap_err();
        assert_eq!(err, MqlError::MissingComponent("HasLimit"));
    }

    #[test]
    fn test_with_replaces_component() {
        let node = Node::empty("query").with(HasLimit(10)).with(HasLimit(1));
        assert_eq!(node.component::<HasLimit>(), Some(&HasLimit(1)));

        let node = node.without::<HasLimit>();
        assert!(!node.has::<HasLimit>());
    }

    #[test]
    fn test_children_preserve_order() {
        let node = Node::new(
            "query",
            vec![HasFilter::new(vec![field_node("a"), field_node("b"), field_node("c")]).into()],
        );

        let names: Vec<&str> = node
            .children()
            .filter_map(|child| child.component::<HasFieldReference<&str>>())
            .filter_map(|field| field.field_name())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_erase_source_keeps_structure() {
        let node = Node::new(
            "query",
            vec![HasFilter::new(vec![field_node("a")]).into()],
        );

        let erased = node.erase_source();
        let child = erased.children().next().unwrap();
        assert_eq!(
            child
                .component::<HasFieldReference<()>>()
                .and_then(|f| f.field_name()),
            Some("a")
        );
    }
}
