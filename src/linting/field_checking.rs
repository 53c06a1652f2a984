//! Field existence and value type checks against the sampled schema

use crate::access::{DataSource, GetCollectionSchema, ReadModelProvider};
use crate::mql::extract::{field_predicate, schema_field_nodes};
use crate::mql::{BsonType, CollectionSchema, HasCollectionReference, Name, Node};

use super::insight::{Inspection, QueryInsight};
use super::lint_skipped;

/// Checks every schema field of `query` against a schema sampled from the
/// cluster. Nothing is reported when the schema cannot be fetched.
pub async fn check_fields<S, D, P>(
    data_source: &D,
    read_model: &P,
    query: &Node<S>,
    sample_size: u64,
) -> Vec<QueryInsight<S>>
where
    S: Clone,
    D: DataSource,
    P: ReadModelProvider<D>,
{
    let namespace = match query
        .component::<HasCollectionReference<S>>()
        .and_then(HasCollectionReference::namespace)
    {
        Some(namespace) if namespace.is_valid() => namespace.clone(),
        _ => return Vec::new(),
    };

    let slice = GetCollectionSchema::new(namespace, sample_size);
    match read_model.slice(data_source, slice).await {
        Ok(schema) => check_fields_against(query, &schema),
        Err(err) => {
            lint_skipped("field_checking", &err);
            Vec::new()
        }
    }
}

/// Checks every schema field of `query` against `schema`.
///
/// A field never observed is reported once. Literals compared to an
/// observed field must be assignable to its type; sort keys and
/// operators that do not compare values (`$exists`, `$size`, ...) are not
/// type checked.
pub fn check_fields_against<S: Clone>(query: &Node<S>, schema: &CollectionSchema) -> Vec<QueryInsight<S>> {
    let mut insights = Vec::new();
    let mut missing: Vec<&str> = Vec::new();

    for node in schema_field_nodes(query) {
        let predicate = match field_predicate(node) {
            Some(predicate) => predicate,
            None => continue,
        };

        let field_type = schema.type_of(predicate.field_name);
        if field_type == BsonType::Null {
            if !missing.contains(&predicate.field_name) {
                missing.push(predicate.field_name);
                insights.push(QueryInsight::new(
                    predicate.field_source.clone(),
                    Inspection::FieldDoesNotExist {
                        field: predicate.field_name.to_string(),
                    },
                ));
            }
            continue;
        }

        let compares_values = predicate.operation.map(compares_values).unwrap_or(false);
        let value = match predicate.value {
            Some(value) if compares_values => value,
            _ => continue,
        };

        if !value.bson_type().is_assignable_to(&field_type) {
            insights.push(QueryInsight::new(
                value.source().clone(),
                Inspection::FieldValueTypeMismatch {
                    field: predicate.field_name.to_string(),
                    field_type,
                    value_type: value.bson_type().clone(),
                },
            ));
        }
    }

    insights
}

fn compares_values(name: Name) -> bool {
    matches!(
        name,
        Name::Eq | Name::Ne | Name::Gt | Name::Gte | Name::Lt | Name::Lte | Name::In | Name::Nin
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{
        CachingReadModelProvider, QueryResult, StubDataSource, StubDriver,
    };
    use crate::mql::parser::parse_query;
    use crate::mql::Namespace;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn schema() -> CollectionSchema {
        CollectionSchema::from_samples(
            Namespace::new("db", "coll"),
            &[json!({"myString": "a", "myInt": 1})],
        )
    }

    fn query(filter: Value) -> Node<()> {
        parse_query(&Namespace::new("db", "coll"), Some(&filter), None, None).unwrap()
    }

    #[test]
    fn test_missing_field_reported_once() {
        let insights = check_fields_against(&query(json!({"myBoolean": true})), &schema());
        assert_eq!(
            insights,
            vec![QueryInsight::new(
                (),
                Inspection::FieldDoesNotExist {
                    field: "myBoolean".into()
                }
            )]
        );
    }

    #[test]
    fn test_missing_field_used_twice() {
        let q = query(json!({"myBoolean": {"$gt": 1, "$lt": 5}}));
        assert_eq!(check_fields_against(&q, &schema()).len(), 1);
    }

    #[test]
    fn test_type_mismatch() {
        let insights = check_fields_against(&query(json!({"myString": 42})), &schema());
        assert_eq!(
            insights,
            vec![QueryInsight::new(
                (),
                Inspection::FieldValueTypeMismatch {
                    field: "myString".into(),
                    field_type: BsonType::String,
                    value_type: BsonType::Int32,
                }
            )]
        );
    }

    #[test]
    fn test_matching_types_are_clean() {
        let q = query(json!({"myString": "b", "myInt": {"$in": [1, 2]}}));
        assert!(check_fields_against(&q, &schema()).is_empty());
    }

    #[test]
    fn test_long_literal_on_int_field_mismatches() {
        let q = query(json!({"myInt": {"$numberLong": "5"}}));
        let insights = check_fields_against(&q, &schema());
        assert_eq!(insights.len(), 1);
    }

    #[test]
    fn test_operators_without_values_are_not_type_checked() {
        let q = query(json!({"myString": {"$exists": true}}));
        assert!(check_fields_against(&q, &schema()).is_empty());
    }

    #[test]
    fn test_sort_keys_are_not_type_checked() {
        let q = parse_query(
            &Namespace::new("db", "coll"),
            None,
            Some(&json!({"myString": -1})),
            None,
        )
        .unwrap();
        assert!(check_fields_against(&q, &schema()).is_empty());
    }

    #[tokio::test]
    async fn test_schema_unavailable_reports_nothing() {
        let data_source = StubDataSource::new(StubDriver::new(|_, _| Ok(QueryResult::NotRun)));
        let provider = CachingReadModelProvider::new(Duration::from_secs(1));

        let insights = check_fields(&data_source, &provider, &query(json!({"x": 1})), 50).await;
        assert!(insights.is_empty());
        assert_eq!(data_source.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetches_schema_through_read_model() {
        let data_source = StubDataSource::new(StubDriver::new(|_, _| {
            Ok(QueryResult::Run(json!([{"myString": "a"}])))
        }));
        let provider = CachingReadModelProvider::new(Duration::from_secs(1));

        let q = query(json!({"myBoolean": true}));
        let first = check_fields(&data_source, &provider, &q, 50).await;
        let second = check_fields(&data_source, &provider, &q, 50).await;

        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
        assert_eq!(data_source.calls(), 1);
    }

    #[tokio::test]
    async fn test_disconnected_reports_nothing() {
        let provider = CachingReadModelProvider::new(Duration::from_secs(1));
        let insights = check_fields(
            &StubDataSource::disconnected(),
            &provider,
            &query(json!({"x": 1})),
            50,
        )
        .await;
        assert!(insights.is_empty());
    }
}
