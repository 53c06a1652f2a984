//! Query model errors

use thiserror::Error;

/// Result type for query model operations
pub type MqlResult<T> = Result<T, MqlError>;

/// Query model errors
///
/// Absence of facts is never an error. These only cover caller
/// contract violations and malformed input to the filter reader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MqlError {
    /// A component that the caller asserted to be present is missing
    #[error("Node has no {0} component")]
    MissingComponent(&'static str),

    /// Filter document is not a JSON object or uses an unsupported shape
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Namespace string is not of the form `db.collection`
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),
}

impl MqlError {
    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingComponent(_) => "MQL_MISSING_COMPONENT",
            Self::InvalidFilter(_) => "MQL_INVALID_FILTER",
            Self::InvalidNamespace(_) => "MQL_INVALID_NAMESPACE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            MqlError::MissingComponent("HasFilter").code(),
            "MQL_MISSING_COMPONENT"
        );
        assert_eq!(
            MqlError::InvalidFilter("x".into()).code(),
            "MQL_INVALID_FILTER"
        );
    }

    #[test]
    fn test_error_display() {
        let err = MqlError::MissingComponent("HasCollectionReference");
        assert_eq!(err.to_string(), "Node has no HasCollectionReference component");
    }
}
