//! # Blockstat - Comparative statistics for transport experiment client logs
//!
//! This library turns client logs produced by competing transport protocols
//! (for example a block-oriented protocol against TCP) into comparable
//! per-run metrics.
//!
//! ## Overview
//!
//! Each client log carries one line per delivered block plus a final
//! connection summary. Blockstat extracts both, normalizes the block records,
//! and derives per-run metrics:
//!
//! - **Throughput**: all delivered bytes over the connection's total time
//! - **Goodput**: bytes of blocks that met their deadline over the same time
//! - **Average block completion time**, overall and per priority class
//!
//! Runs are then lined up in a comparison table, one column per run.
//!
//! ## Architecture
//!
//! - `analysis::log_parser`: block lines and the summary line
//! - `analysis::normalize`: intermediate block table and canonical rows
//! - `analysis::stats`: per-run metrics
//! - `analysis::report`: cross-run comparison table (text and JSON)
//! - `analysis::pipeline`: parallel, order-stable processing of many runs
//! - `config` / `config_loader`: YAML run list and CLI overrides
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use blockstat::analysis::{self, PipelineOptions};
//!
//! let paths = vec![PathBuf::from("dtp_client.log"), PathBuf::from("tcp_client.log")];
//! let labels = vec![Some("DTP".to_string()), Some("TCP".to_string())];
//!
//! let outcomes = analysis::analyze_runs(&paths, &labels, &PipelineOptions::default());
//! let table = analysis::compare(&analysis::pipeline::comparison_input(&outcomes));
//! println!("{}", analysis::render_text(&table));
//! ```
//!
//! ## Log Format
//!
//! ```text
//! <4 header lines>
//! BlockID bct BlockSize Priority Deadline
//! ...
//! connection closed, recv=100 sent=120 lost=5 rtt=12.5ms cwnd=32, total_bytes=5000, complete_bytes=4800, good_bytes=4800, total_time=200000
//! ```
//!
//! ## Error Handling
//!
//! Per-run failures are typed (`thiserror`) and carried in each run's outcome
//! so one bad log never hides the others. The command-line shell uses
//! `color_eyre` for reporting.

pub mod analysis;
pub mod config;
pub mod config_loader;
