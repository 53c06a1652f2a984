//! mql-analyzer - Static analysis of MongoDB queries
//!
//! - `mql`: query tree, BSON type lattice, sampled schemas
//! - `indexing`: ESR index suggestion and consolidation
//! - `access`: read-only slices over a cluster with a caching read model
//! - `linting`: field, namespace, index and query-shape checks
//! - `observability`: structured JSON logging
//! - `config` / `cli`: the `mql-analyzer` command line

pub mod access;
pub mod cli;
pub mod config;
pub mod indexing;
pub mod linting;
pub mod mql;
pub mod observability;
