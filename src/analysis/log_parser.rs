//! Log parsing for transport client logs.
//!
//! A client log is four header lines, zero or more block lines
//! (`BlockID bct BlockSize Priority Deadline`) and a final
//! `connection closed, ...` summary line.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use rayon::prelude::*;
use regex::{Captures, Regex};

use super::error::{BlockLineFault, MalformedBlockLine, ParseError};
use super::types::*;

/// Leading lines that never contain block records
pub const HEADER_LINES: usize = 4;

/// Block line fields, in log order. Also the intermediate table header.
pub const BLOCK_FIELDS: [&str; 5] = ["BlockID", "bct", "BlockSize", "Priority", "Deadline"];

/// How a summary field's value is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Signed integer counter
    Int,
    /// `<float>ms`, or the bare sentinel `-1`
    RttMillis,
}

/// One field of the summary line
#[derive(Debug, Clone, Copy)]
pub struct SummaryField {
    /// Capture group name
    pub name: &'static str,
    /// Literal text preceding the value
    pub prefix: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, prefix: &'static str, kind: FieldKind) -> SummaryField {
    SummaryField { name, prefix, kind }
}

/// Literal the summary line starts with
pub const SUMMARY_PREAMBLE: &str = "connection closed, ";

/// Ordered schema of the summary line:
/// `connection closed, recv=.. sent=.. lost=.. rtt=.. cwnd=.., total_bytes=.., complete_bytes=.., good_bytes=.., total_time=..`
pub const SUMMARY_SCHEMA: [SummaryField; 9] = [
    field("recv", "recv=", FieldKind::Int),
    field("sent", " sent=", FieldKind::Int),
    field("lost", " lost=", FieldKind::Int),
    field("rtt", " rtt=", FieldKind::RttMillis),
    field("cwnd", " cwnd=", FieldKind::Int),
    field("total_bytes", ", total_bytes=", FieldKind::Int),
    field("complete_bytes", ", complete_bytes=", FieldKind::Int),
    field("good_bytes", ", good_bytes=", FieldKind::Int),
    field("total_time", ", total_time=", FieldKind::Int),
];

/// Build the summary regex from [`SUMMARY_SCHEMA`]
fn build_summary_pattern() -> String {
    let mut pattern = format!("^{}", regex::escape(SUMMARY_PREAMBLE));
    for f in SUMMARY_SCHEMA {
        pattern.push_str(&regex::escape(f.prefix));
        match f.kind {
            FieldKind::Int => pattern.push_str(&format!(r"(?P<{}>-?\d+)", f.name)),
            FieldKind::RttMillis => pattern.push_str(&format!(
                r"(?:(?P<{name}>\S+?)ms|(?P<{name}_unavailable>-1))",
                name = f.name
            )),
        }
    }
    pattern
}

/// Compiled summary line pattern
pub static SUMMARY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&build_summary_pattern()).expect("Invalid summary line regex")
});

/// Convert the RTT capture to milliseconds.
///
/// The `-1` sentinel, a missing capture and an unparseable value all
/// collapse to -1, so "unavailable" and "reported as -1" are
/// indistinguishable downstream.
pub fn rtt_from_capture(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(UNAVAILABLE as f64)
}

fn int_field(caps: &Captures<'_>, name: &str) -> Option<i64> {
    caps.name(name)?.as_str().parse().ok()
}

/// Parse the summary line. Every field must be present and well formed.
pub fn parse_summary_line(line: &str) -> Option<ConnectionSummary> {
    let caps = SUMMARY_PATTERN.captures(line.trim_end())?;

    Some(ConnectionSummary {
        received: int_field(&caps, "recv")?,
        sent: int_field(&caps, "sent")?,
        lost: int_field(&caps, "lost")?,
        rtt_ms: rtt_from_capture(caps.name("rtt").map(|m| m.as_str())),
        congestion_window: int_field(&caps, "cwnd")?,
        total_bytes: int_field(&caps, "total_bytes")?,
        complete_bytes: int_field(&caps, "complete_bytes")?,
        good_bytes: int_field(&caps, "good_bytes")?,
        total_time: int_field(&caps, "total_time")?,
        qoe: UNAVAILABLE,
        retry_times: UNAVAILABLE,
    })
}

fn parse_token<T: std::str::FromStr>(token: &str, field: &'static str) -> Result<T, BlockLineFault> {
    token.parse().map_err(|_| BlockLineFault::InvalidValue {
        field,
        token: token.to_string(),
    })
}

/// Millisecond fields must be finite. `nan` and `inf` parse as `f64` too.
fn parse_millis(token: &str, field: &'static str) -> Result<f64, BlockLineFault> {
    let value: f64 = parse_token(token, field)?;
    if !value.is_finite() {
        return Err(BlockLineFault::InvalidValue {
            field,
            token: token.to_string(),
        });
    }
    Ok(value)
}

/// Parse one block line into a record
pub fn parse_block_line(line: &str) -> Result<BlockRecord, BlockLineFault> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let &[id, bct, size, priority, deadline] = &tokens[..] else {
        return Err(BlockLineFault::WrongFieldCount { found: tokens.len() });
    };

    Ok(BlockRecord {
        raw_block_id: parse_token(id, BLOCK_FIELDS[0])?,
        block_completion_time: parse_millis(bct, BLOCK_FIELDS[1])?,
        block_size: parse_token(size, BLOCK_FIELDS[2])?,
        priority: parse_token(priority, BLOCK_FIELDS[3])?,
        deadline: parse_millis(deadline, BLOCK_FIELDS[4])?,
    })
}

/// Parse the full text of a client log.
///
/// Malformed block lines are logged and skipped. A footer that does not
/// match the summary schema fails the whole log.
pub fn parse_log_text(text: &str, file: &Path) -> Result<ParsedLog, ParseError> {
    let lines: Vec<&str> = text.lines().collect();
    let Some((last, body)) = lines.split_last() else {
        return Err(ParseError::EmptyLog { file: file.to_path_buf() });
    };

    let mut blocks = Vec::new();
    let mut malformed_lines = 0;

    for (idx, line) in body.iter().enumerate().skip(HEADER_LINES) {
        if line.trim().is_empty() {
            continue;
        }
        match parse_block_line(line) {
            Ok(block) => blocks.push(block),
            Err(fault) => {
                let malformed = MalformedBlockLine {
                    file: file.to_path_buf(),
                    line_number: idx + 1,
                    fault,
                };
                log::warn!("{}", malformed);
                malformed_lines += 1;
            }
        }
    }

    let summary = parse_summary_line(last).ok_or_else(|| ParseError::SummaryMismatch {
        file: file.to_path_buf(),
        line: last.to_string(),
    })?;

    Ok(ParsedLog {
        file: file.to_path_buf(),
        blocks,
        summary,
        malformed_lines,
    })
}

/// Read and parse a single log file
pub fn parse_log_file(path: &Path) -> Result<ParsedLog, ParseError> {
    let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
        file: path.to_path_buf(),
        source,
    })?;
    parse_log_text(&text, path)
}

/// Parse several log files in parallel. Results keep the input order.
pub fn parse_all_logs(paths: &[PathBuf]) -> Vec<Result<ParsedLog, ParseError>> {
    log::info!("Parsing {} client logs in parallel...", paths.len());

    let results: Vec<Result<ParsedLog, ParseError>> = paths
        .par_iter()
        .map(|path| {
            let result = parse_log_file(path);
            match &result {
                Ok(parsed) => log::debug!(
                    "Parsed {}: {} blocks, {} malformed lines",
                    path.display(),
                    parsed.blocks.len(),
                    parsed.malformed_lines
                ),
                Err(e) => log::warn!("Failed to parse {}: {}", path.display(), e),
            }
            result
        })
        .collect();

    let parsed = results.iter().filter(|r| r.is_ok()).count();
    log::info!("Parsed {} of {} client logs", parsed, paths.len());

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY_SENTINEL: &str = "connection closed, recv=100 sent=120 lost=5 rtt=-1 cwnd=32, total_bytes=5000, complete_bytes=4800, good_bytes=4800, total_time=200000";

    fn log_with(blocks: &[&str], footer: &str) -> String {
        let mut lines = vec!["header 1", "header 2", "header 3", "header 4"];
        lines.extend_from_slice(blocks);
        lines.push(footer);
        lines.join("\n") + "\n"
    }

    #[test]
    fn test_summary_with_rtt_sentinel() {
        let summary = parse_summary_line(SUMMARY_SENTINEL).unwrap();
        assert_eq!(summary.received, 100);
        assert_eq!(summary.sent, 120);
        assert_eq!(summary.lost, 5);
        assert_eq!(summary.rtt_ms, -1.0);
        assert_eq!(summary.congestion_window, 32);
        assert_eq!(summary.total_bytes, 5000);
        assert_eq!(summary.complete_bytes, 4800);
        assert_eq!(summary.good_bytes, 4800);
        assert_eq!(summary.total_time, 200000);
        assert_eq!(summary.qoe, UNAVAILABLE);
        assert_eq!(summary.retry_times, UNAVAILABLE);
    }

    #[test]
    fn test_summary_with_rtt_value() {
        let line = "connection closed, recv=7 sent=9 lost=-1 rtt=23.5ms cwnd=10, total_bytes=1, complete_bytes=2, good_bytes=3, total_time=4";
        let summary = parse_summary_line(line).unwrap();
        assert_eq!(summary.rtt_ms, 23.5);
        // Negative counters pass through unclamped
        assert_eq!(summary.lost, -1);
        assert_eq!(summary.good_bytes, 3);
    }

    #[test]
    fn test_summary_unparseable_rtt_is_unavailable() {
        let line = "connection closed, recv=7 sent=9 lost=0 rtt=fastms cwnd=10, total_bytes=1, complete_bytes=2, good_bytes=3, total_time=4";
        let summary = parse_summary_line(line).unwrap();
        assert_eq!(summary.rtt_ms, -1.0);
    }

    #[test]
    fn test_summary_rejects_missing_field() {
        let line = "connection closed, recv=100 sent=120 lost=5 rtt=-1 cwnd=32, total_bytes=5000, good_bytes=4800, total_time=200000";
        assert!(parse_summary_line(line).is_none());
        assert!(parse_summary_line("").is_none());
    }

    #[test]
    fn test_rtt_from_capture() {
        assert_eq!(rtt_from_capture(Some("12.25")), 12.25);
        assert_eq!(rtt_from_capture(Some("-1")), -1.0);
        assert_eq!(rtt_from_capture(Some("NaN")), -1.0);
        assert_eq!(rtt_from_capture(None), -1.0);
    }

    #[test]
    fn test_block_line() {
        let block = parse_block_line("8 12.5 1400 1 200").unwrap();
        assert_eq!(block.raw_block_id, 8);
        assert_eq!(block.block_completion_time, 12.5);
        assert_eq!(block.block_size, 1400);
        assert_eq!(block.priority, 1);
        assert_eq!(block.deadline, 200.0);
    }

    #[test]
    fn test_block_line_field_count() {
        assert_eq!(
            parse_block_line("8 12.5 1400 1"),
            Err(BlockLineFault::WrongFieldCount { found: 4 })
        );
        assert_eq!(
            parse_block_line("8 12.5 1400 1 200 7"),
            Err(BlockLineFault::WrongFieldCount { found: 6 })
        );
    }

    #[test]
    fn test_block_line_bad_value() {
        assert!(matches!(
            parse_block_line("8 12.5 big 1 200"),
            Err(BlockLineFault::InvalidValue { field: "BlockSize", .. })
        ));
    }

    #[test]
    fn test_block_line_rejects_non_finite_times() {
        for line in ["4 nan 100 1 20", "4 NaN 100 1 20", "4 10 100 1 inf", "4 -inf 100 1 20"] {
            assert!(
                matches!(parse_block_line(line), Err(BlockLineFault::InvalidValue { .. })),
                "accepted {:?}",
                line
            );
        }

        let text = log_with(&["4 nan 100 1 20", "8 10 100 1 20"], SUMMARY_SENTINEL);
        let parsed = parse_log_text(&text, Path::new("client.log")).unwrap();
        assert_eq!(parsed.malformed_lines, 1);
        assert_eq!(parsed.blocks.len(), 1);
        assert_eq!(parsed.blocks[0].block_completion_time, 10.0);
    }

    #[test]
    fn test_parse_log_skips_malformed_lines_in_order() {
        let text = log_with(
            &["4 10 100 1 50", "8 11 100", "", "12 12 100 2 50", "16 13 100 2 50 9", "20 14 100 1 50"],
            SUMMARY_SENTINEL,
        );
        let parsed = parse_log_text(&text, Path::new("client.log")).unwrap();
        let ids: Vec<i64> = parsed.blocks.iter().map(|b| b.raw_block_id).collect();
        assert_eq!(ids, vec![4, 12, 20]);
        assert_eq!(parsed.malformed_lines, 2);
        assert_eq!(parsed.summary.total_time, 200000);
    }

    #[test]
    fn test_parse_log_ignores_header_lines() {
        // Header lines that look like block lines are not records
        let text = ["4 1 1 1 1", "8 1 1 1 1", "12 1 1 1 1", "16 1 1 1 1", "20 1 1 1 1", SUMMARY_SENTINEL].join("\n");
        let parsed = parse_log_text(&text, Path::new("client.log")).unwrap();
        assert_eq!(parsed.blocks.len(), 1);
        assert_eq!(parsed.blocks[0].raw_block_id, 20);
    }

    #[test]
    fn test_parse_log_summary_failure_is_fatal() {
        let text = log_with(&["4 10 100 1 50"], "connection reset");
        let err = parse_log_text(&text, Path::new("client.log")).unwrap_err();
        assert!(matches!(err, ParseError::SummaryMismatch { .. }));
    }

    #[test]
    fn test_parse_log_empty_text() {
        let err = parse_log_text("", Path::new("client.log")).unwrap_err();
        assert!(matches!(err, ParseError::EmptyLog { .. }));
    }

    #[test]
    fn test_short_log_with_only_summary() {
        let parsed = parse_log_text(SUMMARY_SENTINEL, Path::new("client.log")).unwrap();
        assert!(parsed.blocks.is_empty());
        assert_eq!(parsed.summary.sent, 120);
    }
}
