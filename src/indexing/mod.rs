//! Index suggestion
//!
//! Pure, synchronous analysis: nothing here talks to a cluster. Whatever is
//! known about the data arrives as the schema attached to the query's
//! collection reference.
//!
//! - `analyzer`: one ESR-ordered index per query
//! - `consolidation`: one index for a family of sibling queries
//! - `suggested_index`: the result types and their mongosh rendering

mod analyzer;
mod consolidation;
mod field_usage;
mod suggested_index;

pub use analyzer::{analyze, guess_index, NoSiblings, SiblingQueriesFinder};
pub use consolidation::{apply as consolidate, ConsolidationOptions, DEFAULT_SOFT_LIMIT};
pub use field_usage::{all_field_usages, IndexQueryFieldUsage};
pub use suggested_index::{
    filter_document, IndexSuggestionFieldReason, MongoDbIndex, MongoDbIndexField, SortDirection,
    SuggestedIndex,
};
