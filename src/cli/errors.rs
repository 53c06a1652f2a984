//! CLI-specific error types

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::mql::MqlError;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request is well-formed JSON but not what the command expects
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Mql(#[from] MqlError),
}

impl CliError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "MQL_CLI_CONFIG_ERROR",
            Self::Io(_) => "MQL_CLI_IO_ERROR",
            Self::Json(_) | Self::InvalidRequest(_) => "MQL_CLI_INVALID_REQUEST",
            Self::Mql(e) => e.code(),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
