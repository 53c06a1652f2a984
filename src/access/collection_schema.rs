//! Schema sampling slice

use std::time::Duration;

use serde_json::Value;

use crate::mql::{
    CollectionSchema, CommandType, HasCollectionReference, HasFilter, HasLimit, IsCommand,
    Namespace, Node,
};
use crate::observability::{Event, Logger};

use super::driver::{self, MongoDbDriver, QueryContext};
use super::errors::AccessError;
use super::slice::{Slice, SliceFuture};

/// Samples up to `sample_size` documents of a collection and infers its schema
#[derive(Debug, Clone)]
pub struct GetCollectionSchema {
    namespace: Namespace,
    sample_size: u64,
}

impl GetCollectionSchema {
    pub fn new(namespace: Namespace, sample_size: u64) -> Self {
        Self {
            namespace,
            sample_size,
        }
    }

    fn sample_query(&self) -> Node<()> {
        Node::new(
            (),
            vec![
                HasCollectionReference::Known {
                    database_source: Some(()),
                    collection_source: (),
                    namespace: self.namespace.clone(),
                    schema: None,
                }
                .into(),
                IsCommand(CommandType::Find).into(),
                HasFilter::new(Vec::new()).into(),
                HasLimit(self.sample_size).into(),
            ],
        )
    }
}

impl Slice for GetCollectionSchema {
    type Output = CollectionSchema;

    fn id(&self) -> String {
        format!("GetCollectionSchema::{}::{}", self.namespace, self.sample_size)
    }

    fn query_using_driver<'a>(
        &'a self,
        driver: &'a dyn MongoDbDriver,
        timeout: Duration,
    ) -> SliceFuture<'a, CollectionSchema> {
        Box::pin(async move {
            if !self.namespace.is_valid() {
                return Ok(CollectionSchema::empty(self.namespace.clone()));
            }

            let result =
                driver::run(driver, &self.sample_query(), QueryContext::empty(), timeout).await?;
            let samples = match result {
                Value::Array(samples) => samples,
                _ => return Err(AccessError::malformed(self.id(), "expected an array of documents")),
            };

            let schema = CollectionSchema::from_samples(self.namespace.clone(), &samples);

            let namespace = self.namespace.to_string();
            let sampled = samples.len().to_string();
            let fields = schema.all_field_names_qualified().len().to_string();
            Logger::info(
                Event::SchemaSampled.as_str(),
                &[
                    ("fields", fields.as_str()),
                    ("namespace", namespace.as_str()),
                    ("sampled", sampled.as_str()),
                ],
            );

            Ok(schema)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::driver::stub::StubDriver;
    use crate::access::driver::QueryResult;
    use crate::mql::BsonType;
    use serde_json::json;

    #[tokio::test]
    async fn test_samples_with_limit() {
        let driver = StubDriver::new(|query, _| {
            assert_eq!(query.component::<HasLimit>(), Some(&HasLimit(50)));
            assert_eq!(
                query.component::<IsCommand>(),
                Some(&IsCommand(CommandType::Find))
            );
            Ok(QueryResult::Run(json!([
                {"myString": "a", "myInt": 1},
                {"myString": "b", "myInt": 2}
            ])))
        });

        let schema = GetCollectionSchema::new(Namespace::new("db", "coll"), 50)
            .query_using_driver(&driver, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(schema.type_of("myString"), BsonType::String);
        assert_eq!(schema.type_of("myInt"), BsonType::Int32);
        assert_eq!(schema.type_of("myBoolean"), BsonType::Null);
    }

    #[tokio::test]
    async fn test_blank_namespace_skips_driver() {
        let driver = StubDriver::new(|_, _| Ok(QueryResult::Run(json!([]))));

        let schema = GetCollectionSchema::new(Namespace::new("", "coll"), 50)
            .query_using_driver(&driver, Duration::from_secs(1))
            .await
            .unwrap();

        assert!(schema.is_empty());
        assert_eq!(driver.calls(), 0);
    }

    #[tokio::test]
    async fn test_not_run_is_an_error() {
        let driver = StubDriver::new(|_, _| Ok(QueryResult::NotRun));

        let result = GetCollectionSchema::new(Namespace::new("db", "coll"), 10)
            .query_using_driver(&driver, Duration::from_secs(1))
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_id_includes_namespace_and_size() {
        let slice = GetCollectionSchema::new(Namespace::new("db", "coll"), 50);
        assert_eq!(slice.id(), "GetCollectionSchema::db.coll::50");
    }
}
