//! Suggested indexes

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::mql::extract::{field_name, filters, operation, value_reference};
use crate::mql::{HasCollectionReference, Name, Node};

/// Direction of one index key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Key value in an index specification
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

/// Why a field is part of a suggested index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexSuggestionFieldReason {
    RoleEquality,
    RoleSort,
    RoleRange,
}

/// One key of a suggested index
#[derive(Debug, Clone, PartialEq)]
pub struct MongoDbIndexField<S> {
    pub field_name: String,
    pub source: S,
    pub direction: SortDirection,
    pub reason: IndexSuggestionFieldReason,
}

/// A regular B-tree index
#[derive(Debug, Clone, PartialEq)]
pub struct MongoDbIndex<S> {
    pub collection_reference: HasCollectionReference<S>,
    pub fields: Vec<MongoDbIndexField<S>>,
    /// Queries this index is meant to serve
    pub covered_queries: Vec<Node<S>>,
    pub partial_filter_expression: Option<Node<S>>,
}

impl<S> MongoDbIndex<S> {
    /// `self` is no longer than `other` and their leading field names agree
    pub fn is_prefix_of(&self, other: &MongoDbIndex<S>) -> bool {
        self.fields.len() <= other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.field_name == b.field_name)
    }

    /// Either index is a prefix of the other
    pub fn is_compatible_with(&self, other: &MongoDbIndex<S>) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }

    /// Key specification, e.g. `{"status": 1, "created": -1}`
    pub fn key_document(&self) -> Value {
        let keys: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.field_name.clone(), Value::from(f.direction.as_i32())))
            .collect();
        Value::Object(keys)
    }

    pub fn partial_filter_document(&self) -> Option<Value> {
        self.partial_filter_expression.as_ref().map(filter_document)
    }

    /// mongosh command creating this index. `None` unless the namespace is known.
    pub fn create_index_script(&self) -> Option<String> {
        let namespace = self.collection_reference.namespace()?;

        let keys = self
            .fields
            .iter()
            .map(|f| format!("{}: {}", Value::from(f.field_name.as_str()), f.direction.as_i32()))
            .collect::<Vec<_>>()
            .join(", ");

        let options = match self.partial_filter_document() {
            Some(filter) => format!(", {{ partialFilterExpression: {} }}", filter),
            None => String::new(),
        };

        Some(format!(
            "db.getSiblingDB({}).getCollection({}).createIndex({{ {} }}{})",
            Value::from(namespace.database.as_str()),
            Value::from(namespace.collection.as_str()),
            keys,
            options
        ))
    }
}

/// Outcome of index analysis
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestedIndex<S> {
    /// Nothing can be suggested, e.g. the collection is unknown
    NoIndex,
    MongoDbIndex(MongoDbIndex<S>),
}

impl<S> SuggestedIndex<S> {
    pub fn as_mongodb_index(&self) -> Option<&MongoDbIndex<S>> {
        match self {
            SuggestedIndex::MongoDbIndex(index) => Some(index),
            SuggestedIndex::NoIndex => None,
        }
    }

    pub fn is_no_index(&self) -> bool {
        matches!(self, SuggestedIndex::NoIndex)
    }
}

/// Renders a filter tree back to a MongoDB filter document.
///
/// A predicate whose value was erased becomes an `$exists` check.
pub fn filter_document<S>(node: &Node<S>) -> Value {
    let name = operation(node);

    if let Some(logical @ (Name::And | Name::Or | Name::Nor)) = name {
        let children: Vec<Value> = filters(node).iter().map(filter_document).collect();
        return json!({ format!("${}", logical.canonical()): children });
    }

    let field = match field_name(node) {
        Some(field) => field,
        None => return json!({}),
    };
    let value = value_reference(node).and_then(|v| v.value());

    let predicate = match (name, value) {
        (Some(Name::Eq) | None, Some(value)) => value.clone(),
        (Some(name), Some(value)) => json!({ format!("${}", name.canonical()): value }),
        (_, None) => json!({ "$exists": true }),
    };

    let mut document = Map::new();
    document.insert(field.to_string(), predicate);
    Value::Object(document)
}
