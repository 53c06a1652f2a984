//! Fact extraction
//!
//! Small extractors that read one fact from a node. Each returns `None`
//! when the node does not have the expected shape, so callers compose them
//! with `and_then`/`filter_map` and unmatched sub-trees simply contribute
//! nothing.

use serde_json::Value;

use super::bson_type::BsonType;
use super::components::{
    CommandType, HasAggregation, HasFieldReference, HasFilter, HasSorts, HasValueReference,
    IsCommand, Name, Named,
};
use super::node::Node;

/// A predicate on a field: the field, the compared value and the operator
#[derive(Debug)]
pub struct FieldPredicate<'a, S> {
    pub node: &'a Node<S>,
    pub field_name: &'a str,
    pub field_source: &'a S,
    pub value: Option<&'a HasValueReference<S>>,
    pub operation: Option<Name>,
}

/// Field name of a schema-rooted reference
pub fn schema_field_name<S>(node: &Node<S>) -> Option<&str> {
    match node.component::<HasFieldReference<S>>()? {
        HasFieldReference::FromSchema { field_name, .. } => Some(field_name),
        _ => None,
    }
}

/// Field name of any resolved reference
pub fn field_name<S>(node: &Node<S>) -> Option<&str> {
    node.component::<HasFieldReference<S>>()?.field_name()
}

pub fn value_reference<S>(node: &Node<S>) -> Option<&HasValueReference<S>> {
    node.component::<HasValueReference<S>>()
}

pub fn operation<S>(node: &Node<S>) -> Option<Name> {
    node.component::<Named>().map(|named| named.0)
}

pub fn has_name<S>(node: &Node<S>, name: Name) -> bool {
    operation(node) == Some(name)
}

pub fn command<S>(node: &Node<S>) -> Option<CommandType> {
    node.component::<IsCommand>().map(|c| c.0)
}

/// Value and type of a predicate as far as index selection cares.
///
/// Runtime values have a type but no value.
pub fn relevant_value_for_indexing<S>(node: &Node<S>) -> Option<(Option<&Value>, &BsonType)> {
    let value = value_reference(node)?;
    Some((value.value(), value.bson_type()))
}

/// Schema-rooted field predicate of a node
pub fn field_predicate<S>(node: &Node<S>) -> Option<FieldPredicate<'_, S>> {
    match node.component::<HasFieldReference<S>>()? {
        HasFieldReference::FromSchema {
            field_name, source, ..
        } => Some(FieldPredicate {
            node,
            field_name,
            field_source: source,
            value: value_reference(node),
            operation: operation(node),
        }),
        _ => None,
    }
}

/// Top-level filter predicates
pub fn filters<S>(node: &Node<S>) -> &[Node<S>] {
    node.component::<HasFilter<S>>()
        .map(|f| f.children.as_slice())
        .unwrap_or(&[])
}

pub fn sorts<S>(node: &Node<S>) -> &[Node<S>] {
    node.component::<HasSorts<S>>()
        .map(|s| s.children.as_slice())
        .unwrap_or(&[])
}

/// Aggregation stages, in order
pub fn pipeline<S>(node: &Node<S>) -> &[Node<S>] {
    node.component::<HasAggregation<S>>()
        .map(|a| a.children.as_slice())
        .unwrap_or(&[])
}

/// Operator of a pipeline stage, e.g. `Name::Match` for `$match`
pub fn stage_name<S>(stage: &Node<S>) -> Option<Name> {
    operation(stage)
}

/// Every filter node, including those nested in logical operators and
/// pipeline stages, in depth-first order
pub fn all_filters_recursively<S>(node: &Node<S>) -> Vec<&Node<S>> {
    fn walk<'a, S>(nodes: &'a [Node<S>], out: &mut Vec<&'a Node<S>>) {
        for node in nodes {
            out.push(node);
            walk(filters(node), out);
        }
    }

    let mut out = Vec::new();
    walk(filters(node), &mut out);
    for stage in pipeline(node) {
        walk(filters(stage), &mut out);
    }
    out
}

/// Every node in the tree that references a schema field, in depth-first order
pub fn schema_field_nodes<S>(node: &Node<S>) -> Vec<&Node<S>> {
    fn walk<'a, S>(node: &'a Node<S>, out: &mut Vec<&'a Node<S>>) {
        if schema_field_name(node).is_some() {
            out.push(node);
        }
        for child in node.children() {
            walk(child, out);
        }
    }

    let mut out = Vec::new();
    walk(node, &mut out);
    out
}
