//! Core data types for block-completion analysis.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::UnexpectedPriority;

/// Value recorded for counters the log does not provide.
pub const UNAVAILABLE: i64 = -1;

/// One block line from a client log, in arrival order.
///
/// Field names double as the header of the intermediate per-block table
/// (`BlockID,bct,BlockSize,Priority,Deadline`), which external tools read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Block id as encoded by the sender, see [`super::block_id`]
    #[serde(rename = "BlockID")]
    pub raw_block_id: i64,
    /// Time from block request to completion (ms)
    #[serde(rename = "bct")]
    pub block_completion_time: f64,
    #[serde(rename = "BlockSize")]
    pub block_size: u64,
    #[serde(rename = "Priority")]
    pub priority: i64,
    /// Deadline in the same unit as `block_completion_time`
    #[serde(rename = "Deadline")]
    pub deadline: f64,
}

/// Connection-level counters from the `connection closed, ...` footer line.
///
/// Serialized under the legacy column names downstream consumers expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSummary {
    #[serde(rename = "c_recv")]
    pub received: i64,
    #[serde(rename = "c_sent")]
    pub sent: i64,
    #[serde(rename = "c_lost")]
    pub lost: i64,
    /// Smoothed RTT, or -1 when the log reported it as unavailable
    #[serde(rename = "c_rtt(ms)")]
    pub rtt_ms: f64,
    #[serde(rename = "c_cwnd")]
    pub congestion_window: i64,
    #[serde(rename = "c_total_bytes")]
    pub total_bytes: i64,
    #[serde(rename = "c_complete_bytes")]
    pub complete_bytes: i64,
    #[serde(rename = "c_good_bytes")]
    pub good_bytes: i64,
    /// Total connection time in microseconds
    #[serde(rename = "c_total_time(us)")]
    pub total_time: i64,
    /// Not produced by current clients, always [`UNAVAILABLE`]
    pub qoe: i64,
    /// Not produced by current clients, always [`UNAVAILABLE`]
    pub retry_times: i64,
}

impl ConnectionSummary {
    /// Elapsed run time in microseconds, if it can be used as a divisor
    pub fn elapsed_us(&self) -> Option<f64> {
        (self.total_time > 0).then_some(self.total_time as f64)
    }
}

/// Everything extracted from one client log
#[derive(Debug, Clone)]
pub struct ParsedLog {
    pub file: PathBuf,
    pub blocks: Vec<BlockRecord>,
    pub summary: ConnectionSummary,
    /// Number of block lines skipped for having the wrong shape
    pub malformed_lines: usize,
}

/// Application-assigned block priority class.
///
/// Clients only assign 1 (high) and 2 (low); anything else is kept as
/// `Other` so it can be surfaced as an anomaly instead of being merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Priority {
    High,
    Low,
    Other(i64),
}

impl Priority {
    pub fn value(self) -> i64 {
        match self {
            Priority::High => 1,
            Priority::Low => 2,
            Priority::Other(v) => v,
        }
    }

    pub fn is_expected(self) -> bool {
        !matches!(self, Priority::Other(_))
    }
}

impl From<i64> for Priority {
    fn from(value: i64) -> Self {
        match value {
            1 => Priority::High,
            2 => Priority::Low,
            v => Priority::Other(v),
        }
    }
}

impl From<Priority> for i64 {
    fn from(priority: Priority) -> Self {
        priority.value()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Low => write!(f, "low"),
            Priority::Other(v) => write!(f, "unexpected({})", v),
        }
    }
}

/// One canonical row of a normalized run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    /// Logical block id, decoded from the sender's encoding
    pub block_id: i64,
    #[serde(rename = "bct")]
    pub completion_time: f64,
    pub size: u64,
    pub priority: Priority,
    pub deadline: f64,
    /// Per-block duration; no current log source supplies it
    pub duration: Option<f64>,
}

impl NormalizedRow {
    pub fn met_deadline(&self) -> bool {
        self.completion_time <= self.deadline
    }
}

/// Canonical per-block table for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRun {
    pub rows: Vec<NormalizedRow>,
}

impl NormalizedRun {
    /// Canonical column set, stable even when the run is empty
    pub const COLUMNS: [&'static str; 6] =
        ["block_id", "bct", "size", "priority", "deadline", "duration"];

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalizedRow> {
        self.rows.iter()
    }
}

/// Mean completion time of the blocks sharing one priority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityAverage {
    pub priority: Priority,
    pub blocks: usize,
    pub avg_completion_ms: f64,
}

/// Derived metrics for one run.
///
/// `None` means "undefined" (no rows, or no usable elapsed time), which is
/// distinct from a measured zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub blocks: usize,
    /// Summed in `u128` so many large blocks cannot overflow
    pub total_bytes: u128,
    pub good_bytes: u128,
    pub throughput_mbps: Option<f64>,
    pub goodput_mbps: Option<f64>,
    pub avg_completion_ms: Option<f64>,
    /// Sorted by priority: high, low, then unexpected values
    pub avg_completion_by_priority: Vec<PriorityAverage>,
    pub anomalies: Vec<UnexpectedPriority>,
}

impl RunMetrics {
    /// Metrics for a run that produced no usable data
    pub fn undefined() -> Self {
        Self::default()
    }

    pub fn avg_completion_for(&self, priority: Priority) -> Option<f64> {
        self.avg_completion_by_priority
            .iter()
            .find(|p| p.priority == priority)
            .map(|p| p.avg_completion_ms)
    }
}

/// Result of running the whole pipeline over one log file
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub label: String,
    pub source: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<PathBuf>,
    pub summary: Option<ConnectionSummary>,
    pub malformed_lines: usize,
    pub metrics: RunMetrics,
    /// Why the run could not be parsed, if it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl RunOutcome {
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}
