//! Comparison report across runs.
//!
//! Builds a table with one column per run and one row per metric, and
//! renders it as a markdown-style text table or as JSON.

use color_eyre::eyre::{Context, Result};
use serde::Serialize;

use super::error::UnexpectedPriority;
use super::types::*;

/// Text shown for metrics with no defined value
pub const UNDEFINED: &str = "undefined";

/// Label for runs 0.. that the caller did not name: `#0`, `#1`, ...
pub fn default_label(index: usize) -> String {
    format!("#{}", index)
}

/// Resolve one label per run. Missing labels are auto-generated; extra
/// labels are dropped.
pub fn resolve_labels(explicit: &[Option<String>], run_count: usize) -> Vec<String> {
    if explicit.len() > run_count {
        log::warn!(
            "{} labels given for {} runs, ignoring the extra labels",
            explicit.len(),
            run_count
        );
    }
    (0..run_count)
        .map(|i| {
            explicit
                .get(i)
                .cloned()
                .flatten()
                .unwrap_or_else(|| default_label(i))
        })
        .collect()
}

/// How a metric row is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellFormat {
    /// Two decimal places
    Rate,
    /// Whole milliseconds, truncated
    Millis,
}

impl CellFormat {
    pub fn render(self, value: Option<f64>) -> String {
        match (self, value) {
            (_, None) => UNDEFINED.to_string(),
            (_, Some(v)) if !v.is_finite() => UNDEFINED.to_string(),
            (CellFormat::Rate, Some(v)) => format!("{:.2}", v),
            (CellFormat::Millis, Some(v)) => format!("{}", v.trunc() as i64),
        }
    }
}

/// One metric across all runs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub name: &'static str,
    pub format: CellFormat,
    pub values: Vec<Option<f64>>,
}

/// Relative difference between the first two runs' average completion times
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelativeDifference {
    pub first: String,
    pub second: String,
    /// `(second - first) / second * 100`; positive when the first run
    /// completes blocks faster
    pub percent: Option<f64>,
}

/// Priority anomaly attributed to a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunAnomaly {
    pub label: String,
    pub anomaly: UnexpectedPriority,
}

/// Aligned comparison of N runs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonTable {
    pub labels: Vec<String>,
    pub rows: Vec<MetricRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_difference: Option<RelativeDifference>,
    pub anomalies: Vec<RunAnomaly>,
}

pub const THROUGHPUT_ROW: &str = "Throughput (Mbps)";
pub const GOODPUT_ROW: &str = "Goodput (Mbps)";
pub const AVG_COMPLETION_ROW: &str = "Average block completion time (ms)";
pub const HIGH_PRIORITY_ROW: &str = "High priority block completion time (ms)";
pub const LOW_PRIORITY_ROW: &str = "Low priority block completion time (ms)";

/// Percentage by which `first` is below `second`
pub fn relative_difference_percent(first: Option<f64>, second: Option<f64>) -> Option<f64> {
    match (first, second) {
        (Some(a), Some(b)) if b != 0.0 => Some((b - a) / b * 100.0),
        _ => None,
    }
}

/// Build the comparison table. Column order follows `runs`.
pub fn compare(runs: &[(String, RunMetrics)]) -> ComparisonTable {
    let column = |f: fn(&RunMetrics) -> Option<f64>| -> Vec<Option<f64>> {
        runs.iter().map(|(_, m)| f(m)).collect()
    };

    let rows = vec![
        MetricRow {
            name: THROUGHPUT_ROW,
            format: CellFormat::Rate,
            values: column(|m| m.throughput_mbps),
        },
        MetricRow {
            name: GOODPUT_ROW,
            format: CellFormat::Rate,
            values: column(|m| m.goodput_mbps),
        },
        MetricRow {
            name: AVG_COMPLETION_ROW,
            format: CellFormat::Millis,
            values: column(|m| m.avg_completion_ms),
        },
        MetricRow {
            name: HIGH_PRIORITY_ROW,
            format: CellFormat::Millis,
            values: column(|m| m.avg_completion_for(Priority::High)),
        },
        MetricRow {
            name: LOW_PRIORITY_ROW,
            format: CellFormat::Millis,
            values: column(|m| m.avg_completion_for(Priority::Low)),
        },
    ];

    let relative_difference = match runs {
        [(first, a), (second, b), ..] => Some(RelativeDifference {
            first: first.clone(),
            second: second.clone(),
            percent: relative_difference_percent(a.avg_completion_ms, b.avg_completion_ms),
        }),
        _ => None,
    };

    let anomalies = runs
        .iter()
        .flat_map(|(label, m)| {
            m.anomalies.iter().map(move |a| RunAnomaly {
                label: label.clone(),
                anomaly: a.clone(),
            })
        })
        .collect();

    ComparisonTable {
        labels: runs.iter().map(|(label, _)| label.clone()).collect(),
        rows,
        relative_difference,
        anomalies,
    }
}

/// Render the table as markdown-style text
pub fn render_text(table: &ComparisonTable) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("| Metric | {} |", table.labels.join(" | ")));
    lines.push(format!("|---|{}", "---|".repeat(table.labels.len())));
    for row in &table.rows {
        let cells: Vec<String> = row.values.iter().map(|v| row.format.render(*v)).collect();
        lines.push(format!("| {} | {} |", row.name, cells.join(" | ")));
    }

    if let Some(ref diff) = table.relative_difference {
        lines.push(String::new());
        let change = match diff.percent {
            Some(p) if p < 0.0 => format!("{:.2}% higher", -p),
            Some(p) => format!("{:.2}% lower", p),
            None => UNDEFINED.to_string(),
        };
        lines.push(format!(
            "Average block completion time of {} vs {}: {}",
            diff.first, diff.second, change
        ));
    }

    if !table.anomalies.is_empty() {
        lines.push(String::new());
        lines.push("Anomalies:".to_string());
        for a in &table.anomalies {
            lines.push(format!("  {}: {}", a.label, a.anomaly));
        }
    }

    lines.join("\n")
}

/// Report metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub tool_version: &'static str,
    pub total_runs: usize,
    pub failed_runs: usize,
}

/// Full JSON report: per-run detail plus the comparison table
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport<'a> {
    pub metadata: ReportMetadata,
    pub runs: &'a [RunOutcome],
    pub comparison: &'a ComparisonTable,
}

/// Render runs and their comparison as pretty JSON
pub fn render_json(outcomes: &[RunOutcome], table: &ComparisonTable) -> Result<String> {
    let report = ComparisonReport {
        metadata: ReportMetadata {
            generated_at: chrono::Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION"),
            total_runs: outcomes.len(),
            failed_runs: outcomes.iter().filter(|o| o.is_failed()).count(),
        },
        runs: outcomes,
        comparison: table,
    };

    serde_json::to_string_pretty(&report).context("Failed to serialize report to JSON")
}
