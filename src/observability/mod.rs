//! Observability
//!
//! Structured JSON logging with typed events. Logging never changes the
//! outcome of an analysis; write failures are ignored.
//!
//! # Usage
//!
//! ```ignore
//! use mql_analyzer::observability::{Logger, Event};
//!
//! Logger::warn(Event::LintSkipped.as_str(), &[("linter", "index_checking")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

#[cfg(test)]
pub use logger::capture_log;

/// Log an event at its default severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event with fields at its default severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
