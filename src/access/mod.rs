//! Read-only access to a cluster
//!
//! Analyzers and linters see the cluster only through slices: typed,
//! cacheable queries run against a `MongoDbDriver`.
//!
//! # Slices
//!
//! | Slice                 | Output                |
//! |-----------------------|-----------------------|
//! | `GetBuildInfo`        | `BuildInfo`           |
//! | `ExplainQuery`        | `ExplainPlan`         |
//! | `ListDatabases`       | `Vec<String>`         |
//! | `ListCollections`     | `Vec<CollectionInfo>` |
//! | `GetCollectionSchema` | `CollectionSchema`    |
//!
//! The explain slice never fails: anything that prevents classification is
//! `ExplainPlan::NotRun`. The other slices report failures so callers can
//! tell "empty" apart from "unavailable".

mod build_info;
mod collection_schema;
mod driver;
mod errors;
mod explain_query;
mod listing;
mod slice;

pub use build_info::{BuildInfo, GetBuildInfo, DEFAULT_VERSION};
pub use collection_schema::GetCollectionSchema;
pub use driver::{ConnectionString, DriverFuture, MongoDbDriver, QueryContext, QueryResult};
pub use errors::{
    AccessError, AccessResult, DriverError, DriverResult, ReadModelError, ReadModelResult,
};
pub use explain_query::{classify_explain, ExplainPlan, ExplainQuery, INEFFECTIVE_EXAMINED_RATIO};
pub use listing::{CollectionInfo, ListCollections, ListDatabases};
pub use slice::{
    CachingReadModelProvider, DataSource, ReadModelFuture, ReadModelProvider, Slice, SliceFuture,
};

#[cfg(test)]
pub(crate) use driver::stub::StubDriver;
#[cfg(test)]
pub(crate) use slice::stub::StubDataSource;
