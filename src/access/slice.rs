//! Slices and the read model
//!
//! A slice is a typed, read-only query against the driver with a stable id.
//! The read model resolves slices for a data source and caches their
//! results by id, so the same schema sample or database list is fetched
//! once per connection.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::observability::{Event, Logger};

use super::driver::MongoDbDriver;
use super::errors::{AccessResult, ReadModelError, ReadModelResult};

/// Boxed future returned by slices
pub type SliceFuture<'a, T> = Pin<Box<dyn Future<Output = AccessResult<T>> + Send + 'a>>;

/// Boxed future returned by read model providers
pub type ReadModelFuture<'a, T> = Pin<Box<dyn Future<Output = ReadModelResult<T>> + Send + 'a>>;

/// A typed read-only query
pub trait Slice: Send + Sync {
    type Output: Clone + Send + Sync + 'static;

    /// Stable identifier: slice name plus discriminating parameters
    fn id(&self) -> String;

    fn query_using_driver<'a>(
        &'a self,
        driver: &'a dyn MongoDbDriver,
        timeout: Duration,
    ) -> SliceFuture<'a, Self::Output>;
}

/// Something a driver can be obtained for, e.g. a saved connection
pub trait DataSource: Send + Sync {
    /// Unique id of the data source, part of every cache key
    fn id(&self) -> String;

    /// The driver, if a connection is currently open
    fn driver(&self) -> Option<Arc<dyn MongoDbDriver>>;
}

/// Resolves slices for a data source
pub trait ReadModelProvider<D: DataSource>: Send + Sync {
    fn slice<'a, T: Slice + 'a>(&'a self, data_source: &'a D, slice: T) -> ReadModelFuture<'a, T::Output>;
}

type CachedValue = Arc<dyn Any + Send + Sync>;

/// Read model that runs slices with a timeout and caches successful results
pub struct CachingReadModelProvider {
    timeout: Duration,
    cache: RwLock<HashMap<String, CachedValue>>,
}

impl CachingReadModelProvider {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Drops every cached slice of a data source
    pub fn invalidate(&self, data_source_id: &str) {
        let prefix = format!("{}::", data_source_id);
        if let Ok(mut cache) = self.cache.write() {
            cache.retain(|key, _| !key.starts_with(&prefix));
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or(0)
    }

    fn lookup<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        let cache = self.cache.read().ok()?;
        cache.get(key)?.downcast_ref::<T>().cloned()
    }

    fn store<T: Send + Sync + 'static>(&self, key: String, value: T) {
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key, Arc::new(value));
        }
    }
}

impl<D: DataSource> ReadModelProvider<D> for CachingReadModelProvider {
    fn slice<'a, T: Slice + 'a>(&'a self, data_source: &'a D, slice: T) -> ReadModelFuture<'a, T::Output> {
        Box::pin(async move {
            let slice_id = slice.id();
            let key = format!("{}::{}", data_source.id(), slice_id);

            if let Some(cached) = self.lookup::<T::Output>(&key) {
                Logger::trace(Event::SliceCacheHit.as_str(), &[("slice", slice_id.as_str())]);
                return Ok(cached);
            }

            let driver = match data_source.driver() {
                Some(driver) if driver.connected() => driver,
                _ => {
                    Logger::warn(
                        Event::DriverDisconnected.as_str(),
                        &[("data_source", data_source.id().as_str()), ("slice", slice_id.as_str())],
                    );
                    return Err(ReadModelError::Disconnected(data_source.id()));
                }
            };

            Logger::trace(Event::SliceFetchStart.as_str(), &[("slice", slice_id.as_str())]);

            let fetched =
                tokio::time::timeout(self.timeout, slice.query_using_driver(driver.as_ref(), self.timeout))
                    .await;

            let value = match fetched {
                Ok(Ok(value)) => value,
                Ok(Err(err)) => {
                    Logger::warn(
                        Event::SliceFetchFailed.as_str(),
                        &[("error", err.to_string().as_str()), ("slice", slice_id.as_str())],
                    );
                    return Err(err.into());
                }
                Err(_) => {
                    let millis = self.timeout.as_millis() as u64;
                    Logger::warn(
                        Event::SliceFetchFailed.as_str(),
                        &[("error", "timeout"), ("slice", slice_id.as_str())],
                    );
                    return Err(ReadModelError::Timeout {
                        slice: slice_id,
                        millis,
                    });
                }
            };

            Logger::trace(Event::SliceFetchComplete.as_str(), &[("slice", slice_id.as_str())]);
            self.store(key, value.clone());
            Ok(value)
        })
    }
}

#[cfg(test)]
pub(crate) mod stub {
    //! Data source over a shared stub driver

    use super::*;
    use crate::access::driver::stub::StubDriver;

    pub struct StubDataSource {
        pub id: String,
        pub driver: Option<Arc<StubDriver>>,
    }

    impl StubDataSource {
        pub fn new(driver: StubDriver) -> Self {
            Self {
                id: "stub".to_string(),
                driver: Some(Arc::new(driver)),
            }
        }

        pub fn disconnected() -> Self {
            Self {
                id: "stub".to_string(),
                driver: None,
            }
        }

        pub fn calls(&self) -> usize {
            self.driver.as_ref().map(|d| d.calls()).unwrap_or(0)
        }
    }

    impl DataSource for StubDataSource {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn driver(&self) -> Option<Arc<dyn MongoDbDriver>> {
            self.driver
                .clone()
                .map(|driver| driver as Arc<dyn MongoDbDriver>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::stub::StubDataSource;
    use super::*;
    use crate::access::driver::stub::StubDriver;
    use crate::access::driver::{QueryContext, QueryResult};
    use crate::access::errors::AccessError;
    use crate::mql::Node;
    use serde_json::Value;

    struct Ping;

    impl Slice for Ping {
        type Output = Value;

        fn id(&self) -> String {
            "Ping".to_string()
        }

        fn query_using_driver<'a>(
            &'a self,
            driver: &'a dyn MongoDbDriver,
            timeout: Duration,
        ) -> SliceFuture<'a, Value> {
            Box::pin(async move {
                let query = Node::empty(());
                crate::access::driver::run(driver, &query, QueryContext::empty(), timeout).await
            })
        }
    }

    struct Slow;

    impl Slice for Slow {
        type Output = u32;

        fn id(&self) -> String {
            "Slow".to_string()
        }

        fn query_using_driver<'a>(
            &'a self,
            _driver: &'a dyn MongoDbDriver,
            _timeout: Duration,
        ) -> SliceFuture<'a, u32> {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(1)
            })
        }
    }

    #[tokio::test]
    async fn test_second_fetch_hits_cache() {
        let data_source = StubDataSource::new(StubDriver::new(|_, _| {
            Ok(QueryResult::Run(Value::from(1)))
        }));
        let provider = CachingReadModelProvider::new(Duration::from_secs(1));

        assert_eq!(provider.slice(&data_source, Ping).await.unwrap(), Value::from(1));
        assert_eq!(provider.slice(&data_source, Ping).await.unwrap(), Value::from(1));
        assert_eq!(data_source.calls(), 1);
        assert_eq!(provider.cached_len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let data_source = StubDataSource::new(StubDriver::new(|_, _| Ok(QueryResult::NotRun)));
        let provider = CachingReadModelProvider::new(Duration::from_secs(1));

        let err = provider.slice(&data_source, Ping).await.unwrap_err();
        assert!(matches!(err, ReadModelError::Access(AccessError::NotRun(_))));
        assert!(provider.slice(&data_source, Ping).await.is_err());
        assert_eq!(data_source.calls(), 2);
        assert_eq!(provider.cached_len(), 0);
    }

    #[tokio::test]
    async fn test_disconnected_data_source() {
        let provider = CachingReadModelProvider::new(Duration::from_secs(1));
        let err = provider
            .slice(&StubDataSource::disconnected(), Ping)
            .await
            .unwrap_err();
        assert_eq!(err, ReadModelError::Disconnected("stub".into()));
    }

    #[tokio::test]
    async fn test_timeout() {
        let data_source = StubDataSource::new(StubDriver::new(|_, _| Ok(QueryResult::NotRun)));
        let provider = CachingReadModelProvider::new(Duration::from_millis(100));

        let err = provider.slice(&data_source, Slow).await.unwrap_err();
        assert_eq!(
            err,
            ReadModelError::Timeout {
                slice: "Slow".into(),
                millis: 100
            }
        );
    }

    #[tokio::test]
    async fn test_invalidate() {
        let data_source = StubDataSource::new(StubDriver::new(|_, _| {
            Ok(QueryResult::Run(Value::from(1)))
        }));
        let provider = CachingReadModelProvider::new(Duration::from_secs(1));

        provider.slice(&data_source, Ping).await.unwrap();
        provider.invalidate("stub");
        provider.slice(&data_source, Ping).await.unwrap();
        assert_eq!(data_source.calls(), 2);
    }
}
