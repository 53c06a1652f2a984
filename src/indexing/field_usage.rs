//! Per-field usages collected while suggesting an index
//!
//! A usage is one predicate or sort key on a schema field, enriched with
//! what the sampled schema knows about that field. Usages live only for the
//! duration of one analysis.

use std::cmp::Ordering;

use serde_json::Value;

use crate::mql::extract::{
    field_predicate, filters, pipeline, relevant_value_for_indexing, schema_field_nodes,
    sorts, stage_name,
};
use crate::mql::{BsonType, CollectionSchema, Name, Node, QueryRole};

use super::suggested_index::SortDirection;

/// A field as one query uses it
#[derive(Debug, Clone, PartialEq)]
pub struct IndexQueryFieldUsage<S> {
    pub source: S,
    pub field_name: String,
    /// Type of the field in the sampled schema, `Any` without a schema
    pub field_type: BsonType,
    pub value: Option<Value>,
    pub value_type: BsonType,
    pub role: QueryRole,
    /// Percentage of sampled documents holding `value`; lower is rarer
    pub selectivity: Option<f64>,
    pub sort_direction: SortDirection,
    pub operation: Name,
    /// Predicate node this usage was read from; dropped when the value is erased
    pub source_node: Option<Node<S>>,
}

impl<S: Clone> IndexQueryFieldUsage<S> {
    /// Reads a usage from a node with an operator, a schema field and a value
    pub fn from_node(node: &Node<S>, schema: Option<&CollectionSchema>) -> Option<Self> {
        let predicate = field_predicate(node)?;
        let operation = predicate.operation?;
        let (value, value_type) = relevant_value_for_indexing(node)?;
        let role = operation.query_role();

        let field_type = schema
            .map(|schema| schema.type_of(predicate.field_name))
            .unwrap_or(BsonType::Any);

        let selectivity = match (role, schema, value) {
            (QueryRole::Sort, _, _) => None,
            (_, Some(schema), Some(value)) => schema
                .data_distribution
                .selectivity_of(predicate.field_name, value),
            _ => None,
        };

        let sort_direction = if value.and_then(Value::as_f64) == Some(-1.0) {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };

        Some(Self {
            source: predicate.field_source.clone(),
            field_name: predicate.field_name.to_string(),
            field_type,
            value: value.cloned(),
            value_type: value_type.clone(),
            role,
            selectivity,
            sort_direction,
            operation,
            source_node: Some(node.clone()),
        })
    }

    /// Drops the literal when `other` compares the same field differently,
    /// leaving a presence-only usage
    pub fn apply_value_erasure_if_necessary(self, other: &IndexQueryFieldUsage<S>) -> Self {
        if self.value != other.value || self.operation != other.operation {
            return Self {
                value: None,
                source_node: None,
                ..self
            };
        }
        self
    }

    /// Of two usages of the same field, the one less tied to a literal.
    ///
    /// Without literals on either side the higher cardinality wins, which
    /// pushes the field towards the end of the index.
    pub fn least_specific_of(self, other: Self) -> Self {
        match (&self.value, &other.value) {
            (None, None) => {
                if self.value_type.cardinality() > other.value_type.cardinality() {
                    self
                } else {
                    other
                }
            }
            (Some(_), None) => other,
            _ => self,
        }
    }
}

impl<S> IndexQueryFieldUsage<S> {
    /// Index key order: role, then selectivity, then cardinality, then name.
    ///
    /// Usages with a known selectivity come before those without one.
    pub fn by_role_selectivity_and_cardinality(a: &Self, b: &Self) -> Ordering {
        a.role
            .cmp(&b.role)
            .then_with(|| match (a.selectivity, b.selectivity) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| {
                // sort values are always 1 or -1; only the field says anything
                if a.role == QueryRole::Sort && b.role == QueryRole::Sort {
                    a.field_type.cardinality().cmp(&b.field_type.cardinality())
                } else {
                    a.value_type.cardinality().cmp(&b.value_type.cardinality())
                }
            })
            .then_with(|| a.field_name.cmp(&b.field_name))
    }
}

/// Every usage an index could serve, in query order.
///
/// Filters come from the first pipeline stage when it is a `$match`, or
/// from the query filter when there is no pipeline. Sort keys come from
/// the query and from a `$sort` stage right after the leading `$match`.
pub fn all_field_usages<S: Clone>(
    query: &Node<S>,
    schema: Option<&CollectionSchema>,
) -> Vec<IndexQueryFieldUsage<S>> {
    let stages = pipeline(query);

    let (filter_nodes, stage_sorts): (&[Node<S>], &[Node<S>]) = match stages.first() {
        None => (filters(query), &[]),
        Some(first) if stage_name(first) == Some(Name::Match) => {
            let next_sort = stages
                .get(1)
                .filter(|stage| stage_name(*stage) == Some(Name::Sort))
                .map(sorts)
                .unwrap_or(&[]);
            (filters(first), next_sort)
        }
        Some(first) if stage_name(first) == Some(Name::Sort) => (&[], sorts(first)),
        Some(_) => (&[], &[]),
    };

    filter_nodes
        .iter()
        .chain(sorts(query))
        .chain(stage_sorts)
        .flat_map(schema_field_nodes)
        .filter_map(|node| IndexQueryFieldUsage::from_node(node, schema))
        .collect()
}
