//! Block completion analysis for transport experiment client logs.
//!
//! This module parses client logs, normalizes the per-block records, computes
//! throughput/goodput/completion-time metrics per run and compares runs.

pub mod types;
pub mod error;
pub mod block_id;
pub mod log_parser;
pub mod normalize;
pub mod stats;
pub mod report;
pub mod pipeline;

pub use types::*;
pub use error::{ParseError, TableError};
pub use log_parser::{parse_all_logs, parse_log_file};
pub use normalize::{normalize_blocks, normalize_table};
pub use stats::compute_run_metrics;
pub use report::{compare, render_json, render_text};
pub use pipeline::{analyze_runs, PipelineOptions};
