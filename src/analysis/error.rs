//! Error and anomaly types for the analysis pipeline.
//!
//! Fatal-per-run failures (`ParseError`, `TableError`) are returned as errors.
//! Recoverable problems (`MalformedBlockLine`, `UnexpectedPriority`) are
//! plain values that get logged and carried alongside the results.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Failure to extract a run from a client log
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read log file {}: {source}", .file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("log file {} is empty", .file.display())]
    EmptyLog { file: PathBuf },

    #[error("summary line of {} does not match the connection summary schema: {line:?}", .file.display())]
    SummaryMismatch { file: PathBuf, line: String },
}

/// Failure to write or read the intermediate per-block table
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("failed to access block table {}: {source}", .file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid block table {}: {source}", .file.display())]
    Csv {
        file: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("block table {} has header {found:?}, expected {expected:?}", .file.display())]
    Header {
        file: PathBuf,
        found: Vec<String>,
        expected: Vec<String>,
    },
}

/// Why a block line was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlockLineFault {
    #[error("expected 5 fields, found {found}")]
    WrongFieldCount { found: usize },

    #[error("field {field} has invalid value {token:?}")]
    InvalidValue { field: &'static str, token: String },
}

/// A block line that was skipped during parsing
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("malformed block line {line_number} in {}: {fault}", .file.display())]
pub struct MalformedBlockLine {
    pub file: PathBuf,
    /// 1-based line number in the log
    pub line_number: usize,
    pub fault: BlockLineFault,
}

/// Blocks carrying a priority outside the high/low classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("unexpected priority {priority} on {blocks} block(s), avg completion {avg_completion_ms:.1} ms")]
pub struct UnexpectedPriority {
    pub priority: i64,
    pub blocks: usize,
    pub avg_completion_ms: f64,
}
