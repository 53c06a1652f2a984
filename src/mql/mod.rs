//! Query model
//!
//! The query tree every analyzer and linter works on, the BSON type
//! lattice, and the schema and value distribution inferred from sampled
//! documents.
//!
//! # Structure
//!
//! - `Node<S>`: a bag of typed components, at most one per kind
//! - `BsonType`: type lattice with cardinality and assignability
//! - `CollectionSchema` / `DataDistribution`: sampled shape and selectivity
//! - `extract`: combinators that read facts from nodes without failing
//! - `parser`: reader for queries written as MongoDB JSON

mod bson_type;
mod components;
mod distribution;
pub mod ejson;
mod errors;
pub mod extract;
mod namespace;
mod node;
pub mod parser;
mod schema;

pub use bson_type::{BsonType, UNBOUNDED_CARDINALITY};
pub use components::{
    CommandType, Component, ComponentKind, ExplainPlanType, HasAccumulatedFields,
    HasAggregation, HasCollectionReference, HasExplain, HasFieldReference, HasFilter,
    HasLimit, HasProjections, HasRunCommand, HasSorts, HasUpdates, HasValueReference,
    IsCommand, Name, Named, NodeComponent, QueryRole, COMPONENT_KINDS,
};
pub use distribution::{DataDistribution, DistributionValue};
pub use errors::{MqlError, MqlResult};
pub use namespace::Namespace;
pub use node::Node;
pub use schema::CollectionSchema;
