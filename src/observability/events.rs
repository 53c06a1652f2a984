//! Observable events
//!
//! Every log line names one of these events. The string form is stable so
//! log consumers can match on it.

use std::fmt;

use super::logger::Severity;

/// Observable events of the analyzers and the read model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Read model
    /// A slice is about to query the driver
    SliceFetchStart,
    /// A slice returned a value
    SliceFetchComplete,
    /// A slice failed or timed out
    SliceFetchFailed,
    /// A slice was served from cache
    SliceCacheHit,
    /// The data source has no open connection
    DriverDisconnected,

    // Slices
    /// Explain document did not match any known plan shape
    ExplainDecodeFailed,
    /// Collection documents were sampled into a schema
    SchemaSampled,

    // Indexing
    /// One query produced a suggested index
    IndexAnalyzed,
    /// Sibling suggestions were merged
    IndexConsolidated,

    // Linting
    LintStart,
    LintComplete,
    /// A linter gave up because a dependency was unavailable
    LintSkipped,
}

impl Event {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SliceFetchStart => "SLICE_FETCH_START",
            Event::SliceFetchComplete => "SLICE_FETCH_COMPLETE",
            Event::SliceFetchFailed => "SLICE_FETCH_FAILED",
            Event::SliceCacheHit => "SLICE_CACHE_HIT",
            Event::DriverDisconnected => "DRIVER_DISCONNECTED",

            Event::ExplainDecodeFailed => "EXPLAIN_DECODE_FAILED",
            Event::SchemaSampled => "SCHEMA_SAMPLED",

            Event::IndexAnalyzed => "INDEX_ANALYZED",
            Event::IndexConsolidated => "INDEX_CONSOLIDATED",

            Event::LintStart => "LINT_START",
            Event::LintComplete => "LINT_COMPLETE",
            Event::LintSkipped => "LINT_SKIPPED",
        }
    }

    /// Default severity when logged through `log_event`
    pub fn severity(&self) -> Severity {
        match self {
            Event::SliceFetchFailed
            | Event::DriverDisconnected
            | Event::ExplainDecodeFailed
            | Event::LintSkipped => Severity::Warn,
            Event::SliceFetchStart
            | Event::SliceFetchComplete
            | Event::SliceCacheHit
            | Event::LintStart
            | Event::LintComplete => Severity::Trace,
            Event::SchemaSampled | Event::IndexAnalyzed | Event::IndexConsolidated => {
                Severity::Info
            }
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
