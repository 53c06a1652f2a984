//! Errors of the driver facade and read model

use thiserror::Error;

/// Result type for driver calls
pub type DriverResult<T> = Result<T, DriverError>;

/// Result type for slice queries
pub type AccessResult<T> = Result<T, AccessError>;

/// Result type for read model lookups
pub type ReadModelResult<T> = Result<T, ReadModelError>;

/// Failure reported by a driver implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// No connection to the cluster
    #[error("Driver is not connected")]
    NotConnected,

    /// Round-trip exceeded the allowed time
    #[error("Query timed out after {0} ms")]
    Timeout(u64),

    /// Server rejected the command
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// Network or protocol failure
    #[error("Network error: {0}")]
    Network(String),
}

/// Failure while running a slice against a driver
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("{0}")]
    Driver(#[from] DriverError),

    /// The driver declined to run the query
    #[error("Query was not run: {0}")]
    NotRun(String),

    /// The result did not have the expected shape
    #[error("Malformed result for {slice}: {reason}")]
    MalformedResult { slice: String, reason: String },
}

impl AccessError {
    pub fn malformed(slice: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResult {
            slice: slice.into(),
            reason: reason.into(),
        }
    }
}

/// Failure to obtain a slice from the read model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadModelError {
    /// The data source has no connected driver
    #[error("Data source {0} is not connected")]
    Disconnected(String),

    /// The slice did not complete in time
    #[error("Slice {slice} timed out after {millis} ms")]
    Timeout { slice: String, millis: u64 },

    #[error("{0}")]
    Access(#[from] AccessError),
}

impl ReadModelError {
    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Disconnected(_) => "READ_MODEL_DISCONNECTED",
            Self::Timeout { .. } => "READ_MODEL_TIMEOUT",
            Self::Access(AccessError::Driver(_)) => "READ_MODEL_DRIVER_FAILED",
            Self::Access(AccessError::NotRun(_)) => "READ_MODEL_NOT_RUN",
            Self::Access(AccessError::MalformedResult { .. }) => "READ_MODEL_MALFORMED_RESULT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_converts() {
        let err: AccessError = DriverError::NotConnected.into();
        assert_eq!(err.to_string(), "Driver is not connected");

        let err: ReadModelError = err.into();
        assert_eq!(err.code(), "READ_MODEL_DRIVER_FAILED");
    }

    #[test]
    fn test_timeout_display() {
        let err = ReadModelError::Timeout {
            slice: "ListDatabases".into(),
            millis: 1000,
        };
        assert_eq!(err.to_string(), "Slice ListDatabases timed out after 1000 ms");
        assert_eq!(err.code(), "READ_MODEL_TIMEOUT");
    }
}
