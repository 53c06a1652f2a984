//! Analyzer configuration
//!
//! Loaded from a JSON file. Every field is optional; a missing file means
//! all defaults.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::indexing::{ConsolidationOptions, DEFAULT_SOFT_LIMIT};
use crate::linting::{LintOptions, DEFAULT_SAMPLE_SIZE};
use crate::mql::ExplainPlanType;

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] io::Error),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Documents sampled per collection to infer its schema (default: 50)
    #[serde(default = "default_sample_size")]
    pub sample_size: u64,

    /// Sibling indexes folded into one suggestion (default: 10)
    #[serde(default = "default_index_soft_limit")]
    pub index_soft_limit: usize,

    /// Time allowed for one cluster round-trip (default: 1000)
    #[serde(default = "default_slice_timeout_ms")]
    pub slice_timeout_ms: u64,

    /// Explain verbosity used by the index linter (default: "safe")
    #[serde(default)]
    pub explain_plan: ExplainPlanType,
}

fn default_sample_size() -> u64 {
    DEFAULT_SAMPLE_SIZE
}

fn default_index_soft_limit() -> usize {
    DEFAULT_SOFT_LIMIT
}

fn default_slice_timeout_ms() -> u64 {
    1000
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            index_soft_limit: default_index_soft_limit(),
            slice_timeout_ms: default_slice_timeout_ms(),
            explain_plan: ExplainPlanType::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from file; a missing file gives the defaults
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        let config: AnalyzerConfig = serde_json::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.sample_size == 0 {
            return Err(ConfigError::Invalid("sample_size must be > 0".into()));
        }
        if self.index_soft_limit == 0 {
            return Err(ConfigError::Invalid("index_soft_limit must be > 0".into()));
        }
        if self.slice_timeout_ms == 0 {
            return Err(ConfigError::Invalid("slice_timeout_ms must be > 0".into()));
        }
        Ok(())
    }

    pub fn lint_options(&self) -> LintOptions {
        LintOptions {
            sample_size: self.sample_size,
            explain_plan: self.explain_plan,
        }
    }

    pub fn consolidation_options(&self) -> ConsolidationOptions {
        ConsolidationOptions {
            soft_limit: self.index_soft_limit,
        }
    }

    pub fn slice_timeout(&self) -> Duration {
        Duration::from_millis(self.slice_timeout_ms)
    }
}
