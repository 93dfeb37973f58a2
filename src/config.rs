use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::analysis::normalize::DEFAULT_TABLE_SUFFIX;
use crate::analysis::PipelineOptions;

/// Run list that mirrors the YAML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// (Optional) Suffix appended to each log path for its block table (default: ".csv")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_suffix: Option<String>,
    /// (Optional) Whether to write the block table next to each log (default: true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist_table: Option<bool>,
    /// Runs to compare, in column order
    #[serde(default)]
    pub runs: Vec<RunConfig>,
}

/// One client log to analyze
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Path to the client log
    pub path: PathBuf,
    /// (Optional) Column label; defaults to `#<index>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid run configuration: {0}")]
    InvalidRun(String),
    #[error("Invalid table configuration: {0}")]
    InvalidTable(String),
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.runs.is_empty() {
            return Err(ValidationError::InvalidRun(
                "at least one client log is required".to_string(),
            ));
        }

        for (i, run) in self.runs.iter().enumerate() {
            if run.path.as_os_str().is_empty() {
                return Err(ValidationError::InvalidRun(format!(
                    "run {} has an empty path",
                    i
                )));
            }
            if matches!(run.label.as_deref(), Some(l) if l.trim().is_empty()) {
                return Err(ValidationError::InvalidRun(format!(
                    "run {} ({}) has an empty label",
                    i,
                    run.path.display()
                )));
            }
        }

        if matches!(self.table_suffix.as_deref(), Some("")) {
            return Err(ValidationError::InvalidTable(
                "table_suffix cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.runs.iter().map(|r| r.path.clone()).collect()
    }

    pub fn labels(&self) -> Vec<Option<String>> {
        self.runs.iter().map(|r| r.label.clone()).collect()
    }

    /// Pipeline settings derived from this configuration
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            table_suffix: self
                .table_suffix
                .clone()
                .unwrap_or_else(|| DEFAULT_TABLE_SUFFIX.to_string()),
            persist_table: self.persist_table.unwrap_or(true),
        }
    }
}
