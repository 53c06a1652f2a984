//! Driver facade
//!
//! The analyzers never talk to a cluster directly. A `MongoDbDriver`
//! executes query trees and returns their result as JSON; slices build the
//! trees and decode the results.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::Value;

use crate::mql::{
    CommandType, ExplainPlanType, HasLimit, HasRunCommand, IsCommand, Node,
};

use super::errors::{AccessError, AccessResult, DriverResult};

/// Hosts of the current connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionString {
    pub hosts: Vec<String>,
}

impl ConnectionString {
    pub fn new<I, H>(hosts: I) -> Self
    where
        I: IntoIterator<Item = H>,
        H: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
        }
    }
}

/// Execution options for a single query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryContext {
    /// Explain verbosity requested for this run
    pub explain_plan: ExplainPlanType,
    /// The query runs without an explicit user action
    pub automatically_run: bool,
}

impl QueryContext {
    /// Plain execution, no explain
    pub fn empty() -> Self {
        Self {
            explain_plan: ExplainPlanType::None,
            automatically_run: false,
        }
    }

    pub fn explain(explain_plan: ExplainPlanType) -> Self {
        Self {
            explain_plan,
            automatically_run: true,
        }
    }
}

/// Outcome of a query the driver was asked to run
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// The server answered with this document (or scalar)
    Run(Value),
    /// The driver chose not to run the query
    NotRun,
}

/// Boxed future returned by drivers
pub type DriverFuture<'a> = Pin<Box<dyn Future<Output = DriverResult<QueryResult>> + Send + 'a>>;

/// A connection able to execute query trees
pub trait MongoDbDriver: Send + Sync {
    fn connected(&self) -> bool;

    fn connection_string(&self) -> ConnectionString;

    /// Executes `query`. Results are returned as JSON:
    /// - `find` / `aggregate`: array of documents
    /// - `countDocuments`: number
    /// - `runCommand`: the command reply document
    /// - any query with `HasExplain`: the explain document
    fn run_query<'a>(
        &'a self,
        query: &'a Node<()>,
        context: QueryContext,
        timeout: Duration,
    ) -> DriverFuture<'a>;
}

/// Runs a query and unwraps a `Run` result
pub(crate) async fn run(
    driver: &dyn MongoDbDriver,
    query: &Node<()>,
    context: QueryContext,
    timeout: Duration,
) -> AccessResult<Value> {
    match driver.run_query(query, context, timeout).await? {
        QueryResult::Run(value) => Ok(value),
        QueryResult::NotRun => Err(AccessError::NotRun(
            crate::mql::extract::command(query)
                .map(|c| c.canonical())
                .unwrap_or("query")
                .to_string(),
        )),
    }
}

/// Runs an administrative command and returns its reply
pub(crate) async fn run_command(
    driver: &dyn MongoDbDriver,
    command: HasRunCommand,
    timeout: Duration,
) -> AccessResult<Value> {
    let query = Node::empty(())
        .with(IsCommand(CommandType::RunCommand))
        .with(command)
        .with(HasLimit(1));

    run(driver, &query, QueryContext::empty(), timeout).await
}

#[cfg(test)]
pub(crate) mod stub {
    //! In-memory driver answering queries through a closure

    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    type Handler = Box<dyn Fn(&Node<()>, QueryContext) -> DriverResult<QueryResult> + Send + Sync>;

    pub struct StubDriver {
        pub connected: bool,
        pub hosts: Vec<String>,
        handler: Handler,
        calls: AtomicUsize,
    }

    impl StubDriver {
        pub fn new<F>(handler: F) -> Self
        where
            F: Fn(&Node<()>, QueryContext) -> DriverResult<QueryResult> + Send + Sync + 'static,
        {
            Self {
                connected: true,
                hosts: vec!["localhost:27017".to_string()],
                handler: Box::new(handler),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn with_hosts(mut self, hosts: &[&str]) -> Self {
            self.hosts = hosts.iter().map(|h| h.to_string()).collect();
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl MongoDbDriver for StubDriver {
        fn connected(&self) -> bool {
            self.connected
        }

        fn connection_string(&self) -> ConnectionString {
            ConnectionString::new(self.hosts.clone())
        }

        fn run_query<'a>(
            &'a self,
            query: &'a Node<()>,
            context: QueryContext,
            _timeout: Duration,
        ) -> DriverFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = (self.handler)(query, context);
            Box::pin(async move { result })
        }
    }
}
