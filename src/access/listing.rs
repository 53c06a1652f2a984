//! Database and collection listing slices

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mql::HasRunCommand;

use super::driver::{self, MongoDbDriver};
use super::errors::{AccessError, AccessResult};
use super::slice::{Slice, SliceFuture};

/// Names of every database visible to the connection
#[derive(Debug, Clone, Copy, Default)]
pub struct ListDatabases;

impl Slice for ListDatabases {
    type Output = Vec<String>;

    fn id(&self) -> String {
        "ListDatabases".to_string()
    }

    fn query_using_driver<'a>(
        &'a self,
        driver: &'a dyn MongoDbDriver,
        timeout: Duration,
    ) -> SliceFuture<'a, Vec<String>> {
        Box::pin(async move {
            let reply =
                driver::run_command(driver, HasRunCommand::new("admin", "listDatabases"), timeout)
                    .await?;

            let databases = reply
                .get("databases")
                .and_then(Value::as_array)
                .ok_or_else(|| AccessError::malformed(self.id(), "missing databases array"))?;

            Ok(databases
                .iter()
                .filter_map(|db| db.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect())
        })
    }
}

/// A collection or view of a database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    /// `collection`, `view` or `timeseries`
    #[serde(rename = "type")]
    pub collection_type: String,
}

/// Collections of one database
#[derive(Debug, Clone)]
pub struct ListCollections {
    database: String,
}

impl ListCollections {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }
}

impl Slice for ListCollections {
    type Output = Vec<CollectionInfo>;

    fn id(&self) -> String {
        format!("ListCollections::{}", self.database)
    }

    fn query_using_driver<'a>(
        &'a self,
        driver: &'a dyn MongoDbDriver,
        timeout: Duration,
    ) -> SliceFuture<'a, Vec<CollectionInfo>> {
        Box::pin(async move {
            if self.database.trim().is_empty() {
                return Ok(Vec::new());
            }

            let command = HasRunCommand::new(self.database.as_str(), "listCollections")
                .with_argument("authorizedCollections", Value::Bool(true));
            let reply = driver::run_command(driver, command, timeout).await?;

            let batch = reply
                .pointer("/cursor/firstBatch")
                .and_then(Value::as_array)
                .ok_or_else(|| AccessError::malformed(self.id(), "missing cursor.firstBatch"))?;

            Ok(batch
                .iter()
                .filter_map(|collection| {
                    let name = collection.get("name")?.as_str()?;
                    let collection_type = collection
                        .get("type")
                        .and_then(Value::as_str)
                        .unwrap_or("collection");
                    Some(CollectionInfo {
                        name: name.to_string(),
                        collection_type: collection_type.to_string(),
                    })
                })
                .collect())
        })
    }
}
