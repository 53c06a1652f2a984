//! Index analyzer
//!
//! Suggests one compound index for a query, ordered by the ESR rule:
//! equality fields first, then sort fields, then range fields.
//!
//! # Algorithm
//!
//! 1. Collect field usages (see `all_field_usages`); union and irrelevant
//!    operators are dropped.
//! 2. Group usages by field. The group keeps its lowest role and the least
//!    specific value; its direction is the one of its last sort usage.
//! 3. Order fields by role, then selectivity, then cardinality, then name.
//!
//! The analyzer is pure: selectivity and field types come from the schema
//! already attached to the query's collection reference.

use crate::mql::{BsonType, HasCollectionReference, Node, QueryRole};
use crate::observability::{log_event_with_fields, Event};

use super::consolidation::{self, ConsolidationOptions};
use super::field_usage::{all_field_usages, IndexQueryFieldUsage};
use super::suggested_index::{
    IndexSuggestionFieldReason, MongoDbIndex, MongoDbIndexField, SortDirection, SuggestedIndex,
};

/// Finds other queries on the same collection
pub trait SiblingQueriesFinder<S> {
    fn all_siblings_of(&self, query: &Node<S>) -> Vec<Node<S>>;
}

impl<S, F> SiblingQueriesFinder<S> for F
where
    F: Fn(&Node<S>) -> Vec<Node<S>>,
{
    fn all_siblings_of(&self, query: &Node<S>) -> Vec<Node<S>> {
        self(query)
    }
}

/// Sibling finder for a query analyzed on its own
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSiblings;

impl<S> SiblingQueriesFinder<S> for NoSiblings {
    fn all_siblings_of(&self, _query: &Node<S>) -> Vec<Node<S>> {
        Vec::new()
    }
}

/// Suggests an index for `query` that also serves its siblings
pub fn analyze<S, F>(query: &Node<S>, siblings: &F, options: &ConsolidationOptions) -> SuggestedIndex<S>
where
    S: Clone + PartialEq,
    F: SiblingQueriesFinder<S> + ?Sized,
{
    let base = guess_index(query);
    let candidates: Vec<SuggestedIndex<S>> = siblings
        .all_siblings_of(query)
        .iter()
        .map(guess_index)
        .collect();

    consolidation::apply(&base, &candidates, options)
}

/// Suggests an index for a single query
pub fn guess_index<S: Clone>(query: &Node<S>) -> SuggestedIndex<S> {
    let collection_reference = match query.component::<HasCollectionReference<S>>() {
        Some(reference) => reference,
        None => return SuggestedIndex::NoIndex,
    };

    let usages: Vec<IndexQueryFieldUsage<S>> = all_field_usages(query, collection_reference.schema())
        .into_iter()
        .filter(|usage| !matches!(usage.role, QueryRole::Union | QueryRole::Irrelevant))
        .collect();

    let mut fields: Vec<IndexQueryFieldUsage<S>> = group_by_field(usages)
        .into_iter()
        .filter_map(merge_usages)
        .collect();
    fields.sort_by(IndexQueryFieldUsage::by_role_selectivity_and_cardinality);

    let namespace = collection_reference
        .namespace()
        .map(|ns| ns.to_string())
        .unwrap_or_default();
    let field_count = fields.len().to_string();
    log_event_with_fields(
        Event::IndexAnalyzed,
        &[("fields", field_count.as_str()), ("namespace", namespace.as_str())],
    );

    SuggestedIndex::MongoDbIndex(MongoDbIndex {
        collection_reference: collection_reference.clone(),
        fields: fields
            .into_iter()
            .map(|usage| MongoDbIndexField {
                reason: reason_of(usage.role),
                field_name: usage.field_name,
                source: usage.source,
                direction: usage.sort_direction,
            })
            .collect(),
        covered_queries: vec![query.clone()],
        partial_filter_expression: None,
    })
}

/// Groups usages by field name, groups ordered by first occurrence
fn group_by_field<S>(usages: Vec<IndexQueryFieldUsage<S>>) -> Vec<Vec<IndexQueryFieldUsage<S>>> {
    let mut groups: Vec<Vec<IndexQueryFieldUsage<S>>> = Vec::new();
    for usage in usages {
        match groups
            .iter_mut()
            .find(|group| group[0].field_name == usage.field_name)
        {
            Some(group) => group.push(usage),
            None => groups.push(vec![usage]),
        }
    }
    groups
}

/// Collapses all usages of one field into one
fn merge_usages<S: Clone>(mut usages: Vec<IndexQueryFieldUsage<S>>) -> Option<IndexQueryFieldUsage<S>> {
    // stable: first occurrence wins within a role
    usages.sort_by_key(|usage| usage.role);

    let least_specific = usages
        .iter()
        .filter(|usage| matches!(usage.role, QueryRole::Equality | QueryRole::Range))
        .cloned()
        .reduce(IndexQueryFieldUsage::least_specific_of);
    let last_sort = usages
        .iter()
        .rev()
        .find(|usage| usage.role == QueryRole::Sort)
        .cloned();

    let mut merged = usages.into_iter().next()?;
    match (least_specific, &last_sort) {
        (Some(usage), _) => {
            merged.value = usage.value;
            merged.value_type = usage.value_type;
            merged.selectivity = usage.selectivity;
        }
        (None, Some(sort)) => {
            merged.value = sort.value.clone();
            merged.value_type = sort.value_type.clone();
            merged.selectivity = None;
        }
        (None, None) => {
            merged.value_type = BsonType::Any;
        }
    }
    merged.sort_direction = last_sort
        .map(|sort| sort.sort_direction)
        .unwrap_or(SortDirection::Ascending);

    Some(merged)
}

fn reason_of(role: QueryRole) -> IndexSuggestionFieldReason {
    match role {
        QueryRole::Sort => IndexSuggestionFieldReason::RoleSort,
        QueryRole::Range => IndexSuggestionFieldReason::RoleRange,
        _ => IndexSuggestionFieldReason::RoleEquality,
    }
}
