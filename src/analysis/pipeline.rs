//! End-to-end processing of client logs into per-run outcomes.
//!
//! Each run goes log → block table → normalized run → metrics. Block tables
//! are written once per distinct log before the runs fan out, so a log
//! listed twice never has its table rewritten while another run reads it.
//! Runs are processed in parallel; outcomes keep the input order.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use super::error::ParseError;
use super::log_parser::parse_all_logs;
use super::normalize::{normalize_blocks, normalize_table, table_path_for, write_block_table, DEFAULT_TABLE_SUFFIX};
use super::report::resolve_labels;
use super::stats::compute_run_metrics;
use super::types::*;

/// Settings shared by every run in one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Suffix appended to each log path for its block table
    pub table_suffix: String,
    /// Write the block table next to the log and normalize from it
    pub persist_table: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            table_suffix: DEFAULT_TABLE_SUFFIX.to_string(),
            persist_table: true,
        }
    }
}

/// Outcome for a log that could not be parsed
pub fn failed_outcome(source: &Path, label: String, error: &ParseError) -> RunOutcome {
    RunOutcome {
        label,
        source: source.to_path_buf(),
        table: None,
        summary: None,
        malformed_lines: 0,
        metrics: RunMetrics::undefined(),
        failure: Some(error.to_string()),
    }
}

/// Write the block table for one parsed log.
///
/// Returns the table path, or `None` when the write failed and the run
/// should be normalized in memory.
fn persist_table(parsed: &ParsedLog, options: &PipelineOptions) -> Option<PathBuf> {
    let path = table_path_for(&parsed.file, &options.table_suffix);
    match write_block_table(&path, &parsed.blocks) {
        Ok(()) => {
            log::debug!("Wrote block table {}", path.display());
            Some(path)
        }
        Err(e) => {
            log::warn!("{}; normalizing {} in memory", e, parsed.file.display());
            None
        }
    }
}

/// Key identifying the log a table is derived from. Aliased spellings of
/// one file share a key when the path resolves.
fn table_key(log: &Path) -> PathBuf {
    fs::canonicalize(log).unwrap_or_else(|_| log.to_path_buf())
}

/// Write one table per distinct log, keyed by [`table_key`]
fn persist_tables(
    parsed: &[Result<ParsedLog, ParseError>],
    options: &PipelineOptions,
) -> HashMap<PathBuf, Option<PathBuf>> {
    let mut seen = HashSet::new();
    let distinct: Vec<(PathBuf, &ParsedLog)> = parsed
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|p| (table_key(&p.file), p))
        .filter(|(key, _)| seen.insert(key.clone()))
        .collect();

    distinct
        .into_par_iter()
        .map(|(key, p)| (key, persist_table(p, options)))
        .collect()
}

/// Normalize a parsed log (from its table when one was written) and
/// aggregate it
fn finish_run(parsed: ParsedLog, label: String, table: Option<PathBuf>) -> RunOutcome {
    let run = match table {
        Some(ref path) => normalize_table(path),
        None => normalize_blocks(&parsed.blocks),
    };

    let metrics = compute_run_metrics(&run, parsed.summary.elapsed_us());
    if run.is_empty() {
        log::warn!(
            "Run {} ({}) has no block rows, its metrics are undefined",
            label,
            parsed.file.display()
        );
    }

    RunOutcome {
        label,
        source: parsed.file,
        table,
        summary: Some(parsed.summary),
        malformed_lines: parsed.malformed_lines,
        metrics,
        failure: None,
    }
}

/// Normalize and aggregate one parsed log
pub fn analyze_parsed(parsed: ParsedLog, label: String, options: &PipelineOptions) -> RunOutcome {
    let table = if options.persist_table {
        persist_table(&parsed, options)
    } else {
        None
    };
    finish_run(parsed, label, table)
}

/// Analyze several logs. `labels[i]` names `paths[i]`; unnamed runs get `#i`.
pub fn analyze_runs(
    paths: &[PathBuf],
    labels: &[Option<String>],
    options: &PipelineOptions,
) -> Vec<RunOutcome> {
    let labels = resolve_labels(labels, paths.len());
    let parsed = parse_all_logs(paths);

    let tables = if options.persist_table {
        persist_tables(&parsed, options)
    } else {
        HashMap::new()
    };

    let jobs: Vec<_> = parsed.into_iter().zip(labels).zip(paths).collect();

    let outcomes: Vec<RunOutcome> = jobs
        .into_par_iter()
        .map(|((result, label), path)| match result {
            Ok(parsed) => {
                let table = tables.get(&table_key(&parsed.file)).cloned().flatten();
                finish_run(parsed, label, table)
            }
            Err(e) => failed_outcome(path, label, &e),
        })
        .collect();

    let failed = outcomes.iter().filter(|o| o.is_failed()).count();
    log::info!(
        "Analyzed {} runs ({} failed)",
        outcomes.len(),
        failed
    );

    outcomes
}

/// Pair each run's label with its metrics, in run order
pub fn comparison_input(outcomes: &[RunOutcome]) -> Vec<(String, RunMetrics)> {
    outcomes
        .iter()
        .map(|o| (o.label.clone(), o.metrics.clone()))
        .collect()
}
