//! CLI module for mql-analyzer
//!
//! Provides command-line interface for:
//! - analyze-namespace: schema and value distribution of sampled documents
//! - suggest-index: ESR index for a query, consolidated with its siblings
//! - lint-fields: field existence and type checks of a filter

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{analyze_namespace, lint_fields, run, run_command, suggest_index};
pub use errors::{CliError, CliResult};
pub use io::{read_request, write_error, write_response};
