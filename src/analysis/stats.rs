//! Per-run throughput, goodput and block completion statistics.

use std::collections::BTreeMap;

use super::error::UnexpectedPriority;
use super::types::*;

pub const BITS_PER_BYTE: f64 = 8.0;

/// Convert a byte count over an elapsed time in microseconds to Mbps.
///
/// Bits per microsecond equals megabits per second, so no further scaling
/// is applied.
pub fn rate_mbps(bytes: u128, elapsed_us: f64) -> f64 {
    bytes as f64 * BITS_PER_BYTE / elapsed_us
}

/// Compute metrics for one normalized run.
///
/// `elapsed_us` is the run's total time from its connection summary. Rates
/// are undefined without a positive elapsed time; every scalar is undefined
/// for an empty run.
pub fn compute_run_metrics(run: &NormalizedRun, elapsed_us: Option<f64>) -> RunMetrics {
    if run.is_empty() {
        return RunMetrics::undefined();
    }

    let total_bytes: u128 = run.iter().map(|r| u128::from(r.size)).sum();
    let good_bytes: u128 = run
        .iter()
        .filter(|r| r.met_deadline())
        .map(|r| u128::from(r.size))
        .sum();

    let elapsed_us = elapsed_us.filter(|t| t.is_finite() && *t > 0.0);
    let throughput_mbps = elapsed_us.map(|t| rate_mbps(total_bytes, t));
    let goodput_mbps = elapsed_us.map(|t| rate_mbps(good_bytes, t));

    let total_completion: f64 = run.iter().map(|r| r.completion_time).sum();
    let avg_completion_ms = Some(total_completion / run.len() as f64);

    let avg_completion_by_priority = partition_by_priority(run);
    let anomalies: Vec<UnexpectedPriority> = avg_completion_by_priority
        .iter()
        .filter(|p| !p.priority.is_expected())
        .map(|p| UnexpectedPriority {
            priority: p.priority.value(),
            blocks: p.blocks,
            avg_completion_ms: p.avg_completion_ms,
        })
        .collect();

    for anomaly in &anomalies {
        log::warn!("{}", anomaly);
    }

    RunMetrics {
        blocks: run.len(),
        total_bytes,
        good_bytes,
        throughput_mbps,
        goodput_mbps,
        avg_completion_ms,
        avg_completion_by_priority,
        anomalies,
    }
}

/// Mean completion time per distinct priority, sorted by priority
fn partition_by_priority(run: &NormalizedRun) -> Vec<PriorityAverage> {
    let mut groups: BTreeMap<Priority, (f64, usize)> = BTreeMap::new();
    for row in run.iter() {
        let entry = groups.entry(row.priority).or_insert((0.0, 0));
        entry.0 += row.completion_time;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(priority, (sum, blocks))| PriorityAverage {
            priority,
            blocks,
            avg_completion_ms: sum / blocks as f64,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(completion_time: f64, size: u64, priority: i64, deadline: f64) -> NormalizedRow {
        NormalizedRow {
            block_id: 0,
            completion_time,
            size,
            priority: Priority::from(priority),
            deadline,
            duration: None,
        }
    }

    #[test]
    fn test_empty_run_is_undefined() {
        let metrics = compute_run_metrics(&NormalizedRun::default(), Some(1000.0));
        assert_eq!(metrics.throughput_mbps, None);
        assert_eq!(metrics.goodput_mbps, None);
        assert_eq!(metrics.avg_completion_ms, None);
        assert!(metrics.avg_completion_by_priority.is_empty());
        assert_eq!(metrics.blocks, 0);
    }

    #[test]
    fn test_throughput_and_goodput() {
        let run = NormalizedRun {
            rows: vec![row(10.0, 600, 1, 20.0), row(30.0, 400, 2, 20.0)],
        };
        let metrics = compute_run_metrics(&run, Some(1000.0));
        assert_eq!(metrics.total_bytes, 1000);
        assert_eq!(metrics.good_bytes, 600);
        assert_eq!(metrics.throughput_mbps, Some(8.0));
        assert_eq!(metrics.goodput_mbps, Some(4.8));
        assert_eq!(metrics.avg_completion_ms, Some(20.0));
    }

    #[test]
    fn test_deadline_is_inclusive() {
        let run = NormalizedRun {
            rows: vec![row(20.0, 100, 1, 20.0)],
        };
        let metrics = compute_run_metrics(&run, Some(100.0));
        assert_eq!(metrics.good_bytes, 100);
        assert_eq!(metrics.goodput_mbps, metrics.throughput_mbps);
    }

    #[test]
    fn test_rates_scale_inversely_with_elapsed_time() {
        let run = NormalizedRun {
            rows: vec![row(5.0, 800, 1, 10.0), row(50.0, 200, 2, 10.0)],
        };
        let fast = compute_run_metrics(&run, Some(1000.0));
        let slow = compute_run_metrics(&run, Some(2000.0));
        assert_eq!(fast.throughput_mbps.unwrap(), 2.0 * slow.throughput_mbps.unwrap());
        assert_eq!(fast.goodput_mbps.unwrap(), 2.0 * slow.goodput_mbps.unwrap());
    }

    #[test]
    fn test_goodput_never_exceeds_throughput() {
        let run = NormalizedRun {
            rows: vec![row(1.0, 10, 1, 0.5), row(2.0, 20, 2, 3.0), row(9.0, 70, 1, 9.0)],
        };
        for elapsed in [1.0, 7.0, 1e6] {
            let metrics = compute_run_metrics(&run, Some(elapsed));
            let throughput = metrics.throughput_mbps.unwrap();
            let goodput = metrics.goodput_mbps.unwrap();
            assert!(goodput >= 0.0);
            assert!(goodput <= throughput);
        }
    }

    #[test]
    fn test_byte_totals_beyond_u64() {
        let run = NormalizedRun {
            rows: vec![row(1.0, u64::MAX, 1, 5.0), row(2.0, u64::MAX, 2, 5.0), row(9.0, 10, 1, 5.0)],
        };
        let metrics = compute_run_metrics(&run, Some(1e6));
        let expected = 2 * u128::from(u64::MAX);
        assert_eq!(metrics.good_bytes, expected);
        assert_eq!(metrics.total_bytes, expected + 10);
        assert!(metrics.throughput_mbps.unwrap().is_finite());
    }

    #[test]
    fn test_missing_elapsed_time_leaves_rates_undefined() {
        let run = NormalizedRun {
            rows: vec![row(10.0, 100, 1, 20.0)],
        };
        for elapsed in [None, Some(0.0), Some(-5.0)] {
            let metrics = compute_run_metrics(&run, elapsed);
            assert_eq!(metrics.throughput_mbps, None);
            assert_eq!(metrics.goodput_mbps, None);
            assert_eq!(metrics.avg_completion_ms, Some(10.0));
        }
    }

    #[test]
    fn test_priority_partition_is_order_independent() {
        let rows = vec![row(10.0, 1, 1, 0.0), row(30.0, 1, 1, 0.0), row(20.0, 1, 2, 0.0)];
        let mut reversed = rows.clone();
        reversed.reverse();

        for rows in [rows, reversed] {
            let metrics = compute_run_metrics(&NormalizedRun { rows }, None);
            assert_eq!(metrics.avg_completion_for(Priority::High), Some(20.0));
            assert_eq!(metrics.avg_completion_for(Priority::Low), Some(20.0));
            assert!(metrics.anomalies.is_empty());
        }
    }

    #[test]
    fn test_unexpected_priority_is_reported_separately() {
        let run = NormalizedRun {
            rows: vec![row(10.0, 1, 1, 0.0), row(40.0, 1, 3, 0.0), row(60.0, 1, 3, 0.0)],
        };
        let metrics = compute_run_metrics(&run, None);
        assert_eq!(metrics.avg_completion_for(Priority::High), Some(10.0));
        assert_eq!(metrics.avg_completion_for(Priority::Low), None);
        assert_eq!(
            metrics.anomalies,
            vec![UnexpectedPriority {
                priority: 3,
                blocks: 2,
                avg_completion_ms: 50.0
            }]
        );
    }
}
