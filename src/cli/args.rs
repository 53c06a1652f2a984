//! CLI argument definitions using clap
//!
//! Commands:
//! - mql-analyzer analyze-namespace --config <path>
//! - mql-analyzer suggest-index --config <path>
//! - mql-analyzer lint-fields --config <path>
//!
//! Every command reads one JSON request from stdin.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// mql-analyzer - Index suggestions and linting for MongoDB queries
#[derive(Parser, Debug)]
#[command(name = "mql-analyzer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Infer the schema and value distribution of sampled documents
    AnalyzeNamespace {
        /// Path to configuration file
        #[arg(long, default_value = "./mql-analyzer.json")]
        config: PathBuf,
    },

    /// Suggest one index for a query and its siblings
    SuggestIndex {
        /// Path to configuration file
        #[arg(long, default_value = "./mql-analyzer.json")]
        config: PathBuf,
    },

    /// Check the fields of a filter against sampled documents
    LintFields {
        /// Path to configuration file
        #[arg(long, default_value = "./mql-analyzer.json")]
        config: PathBuf,
    },
}

impl Command {
    pub fn config_path(&self) -> &PathBuf {
        match self {
            Command::AnalyzeNamespace { config }
            | Command::SuggestIndex { config }
            | Command::LintFields { config } => config,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        let cli = Cli::parse_from(["mql-analyzer", "suggest-index"]);
        assert_eq!(
            cli.command.config_path(),
            &PathBuf::from("./mql-analyzer.json")
        );
    }

    #[test]
    fn test_explicit_config_path() {
        let cli = Cli::parse_from(["mql-analyzer", "lint-fields", "--config", "/tmp/a.json"]);
        assert!(matches!(cli.command, Command::LintFields { .. }));
        assert_eq!(cli.command.config_path(), &PathBuf::from("/tmp/a.json"));
    }
}
