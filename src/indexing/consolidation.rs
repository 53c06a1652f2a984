//! Index consolidation
//!
//! Folds the indexes suggested for sibling queries into the one index that
//! serves them all. Indexes are bucketed first-fit into partitions whose
//! members are pairwise prefix-compatible; the answer is the widest member
//! of the partition holding the base index.

use serde_json::Value;

use crate::mql::{HasFieldReference, HasFilter, HasValueReference, Name, Named, Node, QueryRole};
use crate::observability::{log_event_with_fields, Event};

use super::field_usage::IndexQueryFieldUsage;
use super::suggested_index::{MongoDbIndex, SuggestedIndex};

/// Default maximum number of sibling indexes folded into one
pub const DEFAULT_SOFT_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsolidationOptions {
    /// Sibling indexes beyond this many are not considered. The base
    /// index always is, and no index loses fields.
    pub soft_limit: usize,
}

impl Default for ConsolidationOptions {
    fn default() -> Self {
        Self {
            soft_limit: DEFAULT_SOFT_LIMIT,
        }
    }
}

/// Consolidates `base` with the indexes of its sibling queries
pub fn apply<S>(
    base: &SuggestedIndex<S>,
    candidates: &[SuggestedIndex<S>],
    options: &ConsolidationOptions,
) -> SuggestedIndex<S>
where
    S: Clone + PartialEq,
{
    let base = match base.as_mongodb_index() {
        Some(index) => index,
        None => return SuggestedIndex::NoIndex,
    };

    let mut partitions = Partitions::default();
    let considered = candidates
        .iter()
        .filter_map(SuggestedIndex::as_mongodb_index)
        .take(options.soft_limit);
    for candidate in considered {
        partitions.add(candidate);
    }
    let base_partition = partitions.add(base);
    let members = &partitions.0[base_partition];

    let mut consolidated = match representative(members) {
        Some(index) => index.clone(),
        None => return SuggestedIndex::NoIndex,
    };
    consolidated.covered_queries = covered_queries(base, members);
    consolidated.partial_filter_expression = if members.len() == 1 {
        base.partial_filter_expression.clone()
    } else {
        infer_partial_filter(members)
    };

    let members_len = members.len().to_string();
    let fields_len = consolidated.fields.len().to_string();
    log_event_with_fields(
        Event::IndexConsolidated,
        &[("fields", fields_len.as_str()), ("members", members_len.as_str())],
    );

    SuggestedIndex::MongoDbIndex(consolidated)
}

/// First-fit buckets of mutually compatible indexes
struct Partitions<'a, S>(Vec<Vec<&'a MongoDbIndex<S>>>);

impl<S> Default for Partitions<'_, S> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'a, S> Partitions<'a, S> {
    /// Adds an index and returns the position of its partition
    fn add(&mut self, index: &'a MongoDbIndex<S>) -> usize {
        let fitting = self
            .0
            .iter()
            .position(|partition| partition.iter().all(|member| member.is_compatible_with(index)));

        match fitting {
            Some(position) => {
                self.0[position].push(index);
                position
            }
            None => {
                self.0.push(vec![index]);
                self.0.len() - 1
            }
        }
    }
}

/// Widest member, ties broken by the number of covered queries, first wins
fn representative<'a, S>(members: &[&'a MongoDbIndex<S>]) -> Option<&'a MongoDbIndex<S>> {
    members.iter().copied().fold(None, |best, index| match best {
        Some(best)
            if (best.fields.len(), best.covered_queries.len())
                >= (index.fields.len(), index.covered_queries.len()) =>
        {
            Some(best)
        }
        _ => Some(index),
    })
}

/// Every member's covered queries, the base's first, without duplicates
fn covered_queries<S: Clone + PartialEq>(
    base: &MongoDbIndex<S>,
    members: &[&MongoDbIndex<S>],
) -> Vec<Node<S>> {
    let mut covered: Vec<Node<S>> = Vec::new();
    let others = members.iter().filter(|member| !std::ptr::eq(**member, base));

    for query in base
        .covered_queries
        .iter()
        .chain(others.flat_map(|member| member.covered_queries.iter()))
    {
        if !covered.contains(query) {
            covered.push(query.clone());
        }
    }
    covered
}

/// Partial filter every member agrees on.
///
/// Only fields filtered by every member survive. A field compared with
/// different literals or operators keeps a presence check only.
fn infer_partial_filter<S: Clone>(members: &[&MongoDbIndex<S>]) -> Option<Node<S>> {
    let per_member: Vec<Vec<IndexQueryFieldUsage<S>>> = members
        .iter()
        .map(|member| partial_filter_usages(member))
        .collect();
    let (first, rest) = per_member.split_first()?;

    let mut survivors: Vec<IndexQueryFieldUsage<S>> = Vec::new();
    for usage in first {
        if survivors.iter().any(|kept| kept.field_name == usage.field_name) {
            continue;
        }

        let mut merged = usage.clone();
        let mut in_every_member = true;
        for usages in rest {
            match usages.iter().find(|other| other.field_name == usage.field_name) {
                Some(other) => merged = merged.apply_value_erasure_if_necessary(other),
                None => {
                    in_every_member = false;
                    break;
                }
            }
        }

        if in_every_member {
            survivors.push(merged);
        }
    }

    match survivors.len() {
        0 => None,
        1 => survivors.pop().map(usage_to_node),
        _ => {
            let source = survivors[0].source.clone();
            let children = survivors.into_iter().map(usage_to_node).collect();
            Some(Node::new(
                source,
                vec![Named(Name::And).into(), HasFilter::new(children).into()],
            ))
        }
    }
}

fn partial_filter_usages<S: Clone>(index: &MongoDbIndex<S>) -> Vec<IndexQueryFieldUsage<S>> {
    let filter = match &index.partial_filter_expression {
        Some(filter) => filter,
        None => return Vec::new(),
    };

    crate::mql::extract::schema_field_nodes(filter)
        .into_iter()
        .filter_map(|node| IndexQueryFieldUsage::from_node(node, None))
        .filter(|usage| usage.role != QueryRole::Sort)
        .collect()
}

fn usage_to_node<S: Clone>(usage: IndexQueryFieldUsage<S>) -> Node<S> {
    if let Some(node) = usage.source_node {
        return node;
    }

    Node::new(
        usage.source.clone(),
        vec![
            Named(Name::Exists).into(),
            HasFieldReference::from_schema(usage.source.clone(), usage.field_name).into(),
            HasValueReference::constant(usage.source, Value::Bool(true)).into(),
        ],
    )
}
