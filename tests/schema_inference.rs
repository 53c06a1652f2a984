//! Schema Inference Tests
//!
//! Schema and value distribution inferred from sampled documents, both
//! directly and through the `GetCollectionSchema` slice on a fake cluster.
//!
//! Test Categories:
//! 1. Type inference
//! 2. Value distribution
//! 3. Sampling slice and read model cache

mod common;

use std::time::Duration;

use serde_json::{json, Value};

use common::{Connection, FakeCluster};
use mql_analyzer::access::{
    CachingReadModelProvider, GetCollectionSchema, ReadModelError, ReadModelProvider,
};
use mql_analyzer::mql::{BsonType, CollectionSchema, Namespace};

fn orders() -> Vec<Value> {
    vec![
        json!({"status": "A", "qty": 1, "address": {"city": "Oslo"}, "tags": ["x"]}),
        json!({"status": "B", "qty": 2.5, "address": {"city": "Rome", "zip": "00100"}}),
        json!({"status": "A", "qty": null, "tags": []}),
        json!({"status": "C"}),
    ]
}

fn read_model() -> CachingReadModelProvider {
    CachingReadModelProvider::new(Duration::from_millis(200))
}

// =============================================================================
// TYPE INFERENCE
// =============================================================================

/// Test: Differing scalar types of one field merge into a flat union.
#[test]
fn test_heterogeneous_field_becomes_any_of() {
    let schema = CollectionSchema::from_samples(Namespace::new("shop", "orders"), &orders());

    assert_eq!(schema.type_of("status"), BsonType::String);
    assert_eq!(
        schema.type_of("qty"),
        BsonType::any_of([BsonType::Int32, BsonType::Double, BsonType::Null])
    );
}

/// Test: Sub-document keys are unioned across samples.
#[test]
fn test_nested_fields_are_merged() {
    let schema = CollectionSchema::from_samples(Namespace::new("shop", "orders"), &orders());

    assert_eq!(schema.type_of("address.city"), BsonType::String);
    assert_eq!(schema.type_of("address.zip"), BsonType::String);

    let paths: Vec<String> = schema
        .all_field_names_qualified()
        .into_iter()
        .map(|(path, _)| path)
        .collect();
    assert!(paths.contains(&"address".to_string()));
    assert!(paths.contains(&"address.zip".to_string()));
}

/// Test: No samples gives an empty schema.
#[test]
fn test_no_samples_is_empty() {
    let schema = CollectionSchema::from_samples(Namespace::new("shop", "orders"), &[]);
    assert!(schema.is_empty());
    assert!(schema.data_distribution.is_empty());
}

// =============================================================================
// VALUE DISTRIBUTION
// =============================================================================

/// Test: Percentages of every observed path add up to 100.
#[test]
fn test_distribution_sums_to_one_hundred() {
    let schema = CollectionSchema::from_samples(Namespace::new("shop", "orders"), &orders());
    let distribution = &schema.data_distribution;

    let paths: Vec<&str> = distribution.paths().collect();
    assert!(paths.contains(&"address.city"));

    for path in paths {
        let sum: f64 = distribution.distribution_for_path(path).unwrap().values().sum();
        assert!((sum - 100.0).abs() < 1e-6, "{} sums to {}", path, sum);
    }
}

/// Test: Selectivity is the share of documents holding a value.
#[test]
fn test_selectivity_of_values() {
    let schema = CollectionSchema::from_samples(Namespace::new("shop", "orders"), &orders());
    let distribution = &schema.data_distribution;

    assert_eq!(distribution.selectivity_of("status", &json!("A")), Some(50.0));
    assert_eq!(distribution.selectivity_of("status", &json!("C")), Some(25.0));
    assert_eq!(distribution.selectivity_of("status", &json!("Z")), None);
}

// =============================================================================
// SAMPLING SLICE AND READ MODEL CACHE
// =============================================================================

/// Test: The slice samples at most the requested number of documents.
#[tokio::test]
async fn test_schema_slice_respects_sample_size() {
    let connection = Connection::open(FakeCluster::new().with_samples(orders()));
    let slice = GetCollectionSchema::new(Namespace::new("shop", "orders"), 1);

    let schema = read_model().slice(&connection, slice).await.unwrap();

    assert_eq!(schema.type_of("qty"), BsonType::Int32);
    assert_eq!(connection.calls(), 1);
}

/// Test: A blank namespace yields an empty schema without a round-trip.
#[tokio::test]
async fn test_blank_namespace_makes_no_call() {
    let connection = Connection::open(FakeCluster::new().with_samples(orders()));
    let slice = GetCollectionSchema::new(Namespace::new("", "orders"), 50);

    let schema = read_model().slice(&connection, slice).await.unwrap();

    assert!(schema.is_empty());
    assert_eq!(connection.calls(), 0);
}

/// Test: The second request for the same slice is served from the cache.
#[tokio::test]
async fn test_schema_is_cached_per_connection() {
    let connection = Connection::open(FakeCluster::new().with_samples(orders()));
    let read_model = read_model();
    let namespace = Namespace::new("shop", "orders");

    let first = read_model
        .slice(&connection, GetCollectionSchema::new(namespace.clone(), 50))
        .await
        .unwrap();
    let second = read_model
        .slice(&connection, GetCollectionSchema::new(namespace.clone(), 50))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(connection.calls(), 1);
    assert_eq!(read_model.cached_len(), 1);

    read_model.invalidate("local");
    read_model
        .slice(&connection, GetCollectionSchema::new(namespace, 50))
        .await
        .unwrap();
    assert_eq!(connection.calls(), 2);
}

/// Test: A slow cluster turns into a timeout error, which is not cached.
#[tokio::test]
async fn test_slow_cluster_times_out() {
    let cluster = FakeCluster::new()
        .with_samples(orders())
        .with_delay(Duration::from_secs(5));
    let connection = Connection::open(cluster);
    let read_model = CachingReadModelProvider::new(Duration::from_millis(20));

    let result = read_model
        .slice(
            &connection,
            GetCollectionSchema::new(Namespace::new("shop", "orders"), 50),
        )
        .await;

    assert!(matches!(result, Err(ReadModelError::Timeout { millis: 20, .. })));
    assert_eq!(read_model.cached_len(), 0);
}

/// Test: A closed connection is reported as disconnected.
#[tokio::test]
async fn test_closed_connection_is_disconnected() {
    let result = read_model()
        .slice(
            &Connection::closed(),
            GetCollectionSchema::new(Namespace::new("shop", "orders"), 50),
        )
        .await;

    assert_eq!(result, Err(ReadModelError::Disconnected("local".to_string())));
}
