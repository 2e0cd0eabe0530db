//! Running statistics over a stream of probe outcomes.
//!
//! Min/max/avg are order-independent. Jitter is the mean absolute difference
//! between chronologically consecutive successful probes, so it depends on
//! arrival order. Failures between two successes neither add a jitter term
//! nor reset the previous sample.

use serde::Serialize;

use crate::prober::ProbeOutcome;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateStats {
    pub total_count: u64,
    pub success_count: u64,
    pub fail_count: u64,
    pub timeout_count: u64,
    pub error_count: u64,
    /// Percentage of non-skipped probes that failed.
    pub loss_ratio: f64,
    pub sum_rtt: f64,
    pub min_rtt: Option<f64>,
    pub max_rtt: Option<f64>,
    pub avg_rtt: Option<f64>,
    /// Spread between the slowest and fastest success.
    pub range_rtt: Option<f64>,
    pub prev_rtt: Option<f64>,
    pub jitter_sum: f64,
    pub jitter_count: u64,
    pub jitter_avg: Option<f64>,
    pub skip_remaining: u64,
}

#[derive(Debug, Clone, Default)]
pub struct StatsAggregator {
    stats: AggregateStats,
}

impl StatsAggregator {
    /// `skip` leading outcomes will be discarded as warm-up.
    pub fn new(skip: u64) -> Self {
        Self {
            stats: AggregateStats {
                skip_remaining: skip,
                ..AggregateStats::default()
            },
        }
    }

    /// True if the next recorded outcome falls inside the skip window.
    pub fn in_skip_window(&self) -> bool {
        self.stats.skip_remaining > 0
    }

    pub fn record(&mut self, outcome: ProbeOutcome) {
        let s = &mut self.stats;
        if s.skip_remaining > 0 {
            s.skip_remaining -= 1;
            return;
        }

        s.total_count += 1;
        match outcome {
            ProbeOutcome::Success { rtt_ms } => {
                s.success_count += 1;
                s.sum_rtt += rtt_ms;
                s.min_rtt = Some(s.min_rtt.map_or(rtt_ms, |m| m.min(rtt_ms)));
                s.max_rtt = Some(s.max_rtt.map_or(rtt_ms, |m| m.max(rtt_ms)));
                s.avg_rtt = Some(s.sum_rtt / s.success_count as f64);
                s.range_rtt = s.max_rtt.zip(s.min_rtt).map(|(max, min)| max - min);

                if let Some(prev) = s.prev_rtt {
                    s.jitter_sum += (prev - rtt_ms).abs();
                    s.jitter_count += 1;
                    s.jitter_avg = Some(s.jitter_sum / s.jitter_count as f64);
                }
                s.prev_rtt = Some(rtt_ms);
            }
            ProbeOutcome::Timeout => {
                s.fail_count += 1;
                s.timeout_count += 1;
            }
            ProbeOutcome::ConnectionError => {
                s.fail_count += 1;
                s.error_count += 1;
            }
        }

        s.loss_ratio = s.fail_count as f64 / s.total_count as f64 * 100.0;
    }

    pub fn snapshot(&self) -> AggregateStats {
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(rtt_ms: f64) -> ProbeOutcome {
        ProbeOutcome::Success { rtt_ms }
    }

    fn feed(skip: u64, outcomes: &[ProbeOutcome]) -> AggregateStats {
        let mut agg = StatsAggregator::new(skip);
        for o in outcomes {
            agg.record(*o);
        }
        agg.snapshot()
    }

    #[test]
    fn empty_run_is_zeroed() {
        let s = StatsAggregator::new(0).snapshot();
        assert_eq!(s.total_count, 0);
        assert_eq!(s.loss_ratio, 0.0);
        assert_eq!(s.min_rtt, None);
        assert_eq!(s.avg_rtt, None);
        assert_eq!(s.range_rtt, None);
        assert_eq!(s.jitter_avg, None);
    }

    #[test]
    fn range_spans_fastest_to_slowest() {
        assert_eq!(feed(0, &[ok(7.5)]).range_rtt, Some(0.0));
        let s = feed(0, &[ok(12.0), ProbeOutcome::Timeout, ok(4.0), ok(9.0)]);
        assert_eq!(s.range_rtt, Some(8.0));
    }

    #[test]
    fn mixed_stream_matches_expected_summary() {
        let s = feed(
            0,
            &[
                ok(5.0),
                ProbeOutcome::Timeout,
                ok(15.0),
                ProbeOutcome::ConnectionError,
                ok(10.0),
            ],
        );
        assert_eq!(s.total_count, 5);
        assert_eq!(s.success_count, 3);
        assert_eq!(s.fail_count, 2);
        assert_eq!(s.timeout_count, 1);
        assert_eq!(s.error_count, 1);
        assert_eq!(s.loss_ratio, 40.0);
        assert_eq!(s.min_rtt, Some(5.0));
        assert_eq!(s.max_rtt, Some(15.0));
        assert_eq!(s.avg_rtt, Some(10.0));
        assert_eq!(s.range_rtt, Some(10.0));
        assert_eq!(s.jitter_avg, Some(7.5));
        assert_eq!(s.total_count, s.success_count + s.fail_count);
    }

    #[test]
    fn min_max_avg_ignore_order() {
        let forward = feed(0, &[ok(3.0), ok(9.0), ok(6.0)]);
        let reversed = feed(0, &[ok(6.0), ok(9.0), ok(3.0)]);
        for s in [&forward, &reversed] {
            assert_eq!(s.min_rtt, Some(3.0));
            assert_eq!(s.max_rtt, Some(9.0));
            assert_eq!(s.avg_rtt, Some(6.0));
        }
    }

    #[test]
    fn jitter_depends_on_order() {
        let a = feed(0, &[ok(10.0), ok(10.0), ok(20.0)]);
        let b = feed(0, &[ok(10.0), ok(20.0), ok(10.0)]);
        assert_eq!(a.jitter_avg, Some(5.0));
        assert_eq!(b.jitter_avg, Some(10.0));
    }

    #[test]
    fn jitter_needs_two_successes() {
        let s = feed(0, &[ok(4.0), ProbeOutcome::Timeout]);
        assert_eq!(s.jitter_count, 0);
        assert_eq!(s.jitter_avg, None);
        assert_eq!(s.prev_rtt, Some(4.0));
    }

    #[test]
    fn min_seeded_from_first_success_not_zero() {
        let s = feed(0, &[ProbeOutcome::Timeout, ok(42.0), ok(50.0)]);
        assert_eq!(s.min_rtt, Some(42.0));
        assert_eq!(s.max_rtt, Some(50.0));
    }

    #[test]
    fn loss_ratio_tracks_failures() {
        assert_eq!(feed(0, &[ok(1.0), ok(2.0)]).loss_ratio, 0.0);
        assert_eq!(
            feed(0, &[ProbeOutcome::Timeout, ProbeOutcome::ConnectionError]).loss_ratio,
            100.0
        );
        let s = feed(0, &[ok(1.0), ok(1.0), ok(1.0), ProbeOutcome::Timeout]);
        assert_eq!(s.loss_ratio, 25.0);
        assert_eq!(s.min_rtt, Some(1.0));
    }

    #[test]
    fn skip_window_leaves_no_trace() {
        let s = feed(
            3,
            &[
                ok(100.0),
                ProbeOutcome::Timeout,
                ProbeOutcome::ConnectionError,
                ok(10.0),
                ok(20.0),
            ],
        );
        assert_eq!(s.skip_remaining, 0);
        assert_eq!(s.total_count, 2);
        assert_eq!(s.success_count, 2);
        assert_eq!(s.fail_count, 0);
        assert_eq!(s.sum_rtt, 30.0);
        assert_eq!(s.min_rtt, Some(10.0));
        assert_eq!(s.max_rtt, Some(20.0));
        // 100 -> 10 would have contributed 90 if the warm-up sample leaked in.
        assert_eq!(s.jitter_count, 1);
        assert_eq!(s.jitter_avg, Some(10.0));
    }

    #[test]
    fn skip_window_reports_progress() {
        let mut agg = StatsAggregator::new(1);
        assert!(agg.in_skip_window());
        agg.record(ProbeOutcome::Timeout);
        assert!(!agg.in_skip_window());
        assert_eq!(agg.snapshot(), StatsAggregator::new(0).snapshot());
    }

    #[test]
    fn run_ending_inside_skip_window_stays_empty() {
        let s = feed(5, &[ProbeOutcome::Timeout; 2]);
        assert_eq!(s.skip_remaining, 3);
        assert_eq!(s.total_count, 0);
        assert_eq!(s.loss_ratio, 0.0);
    }
}
