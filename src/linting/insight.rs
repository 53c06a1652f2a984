//! Query insights
//!
//! An insight is one finding about a query: what was found (the
//! inspection and its payload) and where (the source of the node to
//! highlight). Rendering is up to the caller.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};

use crate::mql::BsonType;

/// Broad class of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionCategory {
    Performance,
    Correctness,
    EnvironmentMismatch,
}

/// What a user can do about a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InspectionAction {
    NoAction,
    RunQuery,
    CreateIndexSuggestionScript,
    ChooseConnection,
}

/// A finding and its payload
#[derive(Debug, Clone, PartialEq)]
pub enum Inspection {
    /// Field never observed in the sampled documents
    FieldDoesNotExist { field: String },
    FieldValueTypeMismatch {
        field: String,
        field_type: BsonType,
        value_type: BsonType,
    },
    DatabaseDoesNotExist { database: String },
    CollectionDoesNotExist { database: String, collection: String },
    NoDatabaseInferred { collection: String },
    NoCollectionSpecified,
    /// The winning plan scans the whole collection
    QueryNotCoveredByIndex,
    /// An index is used, but the server still sorts or filters in memory
    QueryNotUsingEffectiveIndex { index_name: Option<String> },
    QueryNotUsingFilters,
    /// Inclusion inside a projection that also excludes fields
    InvalidProjection { field: String },
}

impl Inspection {
    /// Stable code, e.g. `FIELD_DOES_NOT_EXIST`
    pub fn code(&self) -> &'static str {
        match self {
            Inspection::FieldDoesNotExist { .. } => "FIELD_DOES_NOT_EXIST",
            Inspection::FieldValueTypeMismatch { .. } => "FIELD_VALUE_TYPE_MISMATCH",
            Inspection::DatabaseDoesNotExist { .. } => "DATABASE_DOES_NOT_EXIST",
            Inspection::CollectionDoesNotExist { .. } => "COLLECTION_DOES_NOT_EXIST",
            Inspection::NoDatabaseInferred { .. } => "NO_DATABASE_INFERRED",
            Inspection::NoCollectionSpecified => "NO_COLLECTION_SPECIFIED",
            Inspection::QueryNotCoveredByIndex => "QUERY_NOT_COVERED_BY_INDEX",
            Inspection::QueryNotUsingEffectiveIndex { .. } => "QUERY_NOT_USING_EFFECTIVE_INDEX",
            Inspection::QueryNotUsingFilters => "QUERY_NOT_USING_FILTERS",
            Inspection::InvalidProjection { .. } => "INVALID_PROJECTION",
        }
    }

    pub fn category(&self) -> InspectionCategory {
        match self {
            Inspection::QueryNotCoveredByIndex
            | Inspection::QueryNotUsingEffectiveIndex { .. }
            | Inspection::QueryNotUsingFilters => InspectionCategory::Performance,
            Inspection::FieldDoesNotExist { .. }
            | Inspection::FieldValueTypeMismatch { .. }
            | Inspection::InvalidProjection { .. } => InspectionCategory::Correctness,
            Inspection::DatabaseDoesNotExist { .. }
            | Inspection::CollectionDoesNotExist { .. }
            | Inspection::NoDatabaseInferred { .. }
            | Inspection::NoCollectionSpecified => InspectionCategory::EnvironmentMismatch,
        }
    }

    pub fn action(&self) -> InspectionAction {
        match self.category() {
            InspectionCategory::Performance => InspectionAction::CreateIndexSuggestionScript,
            InspectionCategory::Correctness => InspectionAction::RunQuery,
            InspectionCategory::EnvironmentMismatch => InspectionAction::ChooseConnection,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "code": self.code(),
            "category": self.category(),
            "action": self.action(),
            "message": self.to_string(),
        })
    }
}

impl fmt::Display for Inspection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inspection::FieldDoesNotExist { field } => {
                write!(f, "Field \"{}\" does not exist in the collection", field)
            }
            Inspection::FieldValueTypeMismatch {
                field,
                field_type,
                value_type,
            } => write!(
                f,
                "A value of type {} cannot be compared to field \"{}\" of type {}",
                value_type, field, field_type
            ),
            Inspection::DatabaseDoesNotExist { database } => {
                write!(f, "Database \"{}\" does not exist", database)
            }
            Inspection::CollectionDoesNotExist {
                database,
                collection,
            } => write!(f, "Namespace \"{}.{}\" does not exist", database, collection),
            Inspection::NoDatabaseInferred { collection } => write!(
                f,
                "No database could be inferred for collection \"{}\"",
                collection
            ),
            Inspection::NoCollectionSpecified => write!(f, "No collection specified"),
            Inspection::QueryNotCoveredByIndex => {
                write!(f, "Query runs a collection scan; no index covers it")
            }
            Inspection::QueryNotUsingEffectiveIndex { index_name: Some(name) } => {
                write!(f, "Query uses index \"{}\" ineffectively", name)
            }
            Inspection::QueryNotUsingEffectiveIndex { index_name: None } => {
                write!(f, "Query uses an index ineffectively")
            }
            Inspection::QueryNotUsingFilters => write!(f, "Query does not filter any field"),
            Inspection::InvalidProjection { field } => write!(
                f,
                "Field \"{}\" is included in a projection that also excludes fields",
                field
            ),
        }
    }
}

/// One finding on a query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryInsight<S> {
    /// Source of the node to highlight
    pub source: S,
    pub inspection: Inspection,
}

impl<S> QueryInsight<S> {
    pub fn new(source: S, inspection: Inspection) -> Self {
        Self { source, inspection }
    }

    pub fn category(&self) -> InspectionCategory {
        self.inspection.category()
    }

    pub fn action(&self) -> InspectionAction {
        self.inspection.action()
    }
}
