//! Namespace existence checks
//!
//! The first matching finding wins:
//! 1. database missing from the cluster
//! 2. collection missing from its database
//! 3. collection known but its database not inferred
//! 4. no collection at all

use crate::access::{DataSource, ListCollections, ListDatabases, ReadModelProvider};
use crate::mql::{HasCollectionReference, Node};

use super::insight::{Inspection, QueryInsight};
use super::lint_skipped;

pub async fn check_namespace<S, D, P>(
    data_source: &D,
    read_model: &P,
    query: &Node<S>,
) -> Vec<QueryInsight<S>>
where
    S: Clone,
    D: DataSource,
    P: ReadModelProvider<D>,
{
    let (collection_source, namespace) = match query.component::<HasCollectionReference<S>>() {
        Some(HasCollectionReference::Known {
            collection_source,
            namespace,
            ..
        }) => (collection_source, namespace),
        Some(HasCollectionReference::OnlyCollection {
            collection_source,
            collection,
        }) if !collection.is_empty() => {
            return vec![QueryInsight::new(
                collection_source.clone(),
                Inspection::NoDatabaseInferred {
                    collection: collection.clone(),
                },
            )];
        }
        _ => {
            return vec![QueryInsight::new(
                query.source.clone(),
                Inspection::NoCollectionSpecified,
            )];
        }
    };

    let databases = match read_model.slice(data_source, ListDatabases).await {
        Ok(databases) => databases,
        Err(err) => {
            lint_skipped("namespace_checking", &err);
            return Vec::new();
        }
    };

    if !databases.contains(&namespace.database) {
        return vec![QueryInsight::new(
            collection_source.clone(),
            Inspection::DatabaseDoesNotExist {
                database: namespace.database.clone(),
            },
        )];
    }

    let collections = match read_model
        .slice(data_source, ListCollections::new(namespace.database.as_str()))
        .await
    {
        Ok(collections) => collections,
        Err(err) => {
            lint_skipped("namespace_checking", &err);
            return Vec::new();
        }
    };

    if collections.iter().any(|c| c.name == namespace.collection) {
        return Vec::new();
    }

    vec![QueryInsight::new(
        collection_source.clone(),
        Inspection::CollectionDoesNotExist {
            database: namespace.database.clone(),
            collection: namespace.collection.clone(),
        },
    )]
}
