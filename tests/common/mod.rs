//! Shared fixtures for integration tests
//!
//! `FakeCluster` answers the queries slices send by looking at their
//! components: admin commands, explains, and sampling finds.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use mql_analyzer::access::{
    ConnectionString, DataSource, DriverFuture, MongoDbDriver, QueryContext, QueryResult,
};
use mql_analyzer::mql::{HasExplain, HasLimit, HasRunCommand, Node};

pub struct FakeCluster {
    /// `(database, collections)` pairs
    pub databases: Vec<(String, Vec<String>)>,
    /// Documents returned by every sampling find
    pub samples: Vec<Value>,
    /// Document returned by every explain
    pub explain: Value,
    /// Artificial latency of every round-trip
    pub delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self {
            databases: Vec::new(),
            samples: Vec::new(),
            explain: json!({}),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_database(mut self, database: &str, collections: &[&str]) -> Self {
        self.databases.push((
            database.to_string(),
            collections.iter().map(|c| c.to_string()).collect(),
        ));
        self
    }

    pub fn with_samples(mut self, samples: Vec<Value>) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_explain(mut self, explain: Value) -> Self {
        self.explain = explain;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self, query: &Node<()>) -> Value {
        if let Some(command) = query.component::<HasRunCommand>() {
            return match command.command_name.as_str() {
                "listDatabases" => {
                    let names: Vec<Value> = self
                        .databases
                        .iter()
                        .map(|(name, _)| json!({ "name": name }))
                        .collect();
                    json!({ "databases": names })
                }
                "listCollections" => {
                    let collections: Vec<Value> = self
                        .databases
                        .iter()
                        .filter(|(name, _)| *name == command.database)
                        .flat_map(|(_, collections)| collections.iter())
                        .map(|name| json!({ "name": name, "type": "collection" }))
                        .collect();
                    json!({ "cursor": { "firstBatch": collections } })
                }
                _ => json!({ "ok": 1 }),
            };
        }

        if query.has::<HasExplain>() {
            return self.explain.clone();
        }

        let limit = query
            .component::<HasLimit>()
            .map(|limit| limit.0 as usize)
            .unwrap_or(usize::MAX);
        Value::Array(self.samples.iter().take(limit).cloned().collect())
    }
}

impl MongoDbDriver for FakeCluster {
    fn connected(&self) -> bool {
        true
    }

    fn connection_string(&self) -> ConnectionString {
        ConnectionString::new(["localhost:27017"])
    }

    fn run_query<'a>(
        &'a self,
        query: &'a Node<()>,
        _context: QueryContext,
        _timeout: Duration,
    ) -> DriverFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = self.answer(query);
        let delay = self.delay;

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(QueryResult::Run(answer))
        })
    }
}

/// A saved connection, optionally open
pub struct Connection {
    pub id: String,
    pub cluster: Option<Arc<FakeCluster>>,
}

impl Connection {
    pub fn open(cluster: FakeCluster) -> Self {
        Self {
            id: "local".to_string(),
            cluster: Some(Arc::new(cluster)),
        }
    }

    pub fn closed() -> Self {
        Self {
            id: "local".to_string(),
            cluster: None,
        }
    }

    pub fn calls(&self) -> usize {
        self.cluster.as_ref().map(|c| c.calls()).unwrap_or(0)
    }
}

impl DataSource for Connection {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn driver(&self) -> Option<Arc<dyn MongoDbDriver>> {
        self.cluster
            .clone()
            .map(|cluster| cluster as Arc<dyn MongoDbDriver>)
    }
}
