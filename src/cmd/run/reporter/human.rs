use std::time::Duration;

use super::{Counters, Reporter};
use crate::cmd::run::outcome::{RequestOutcome, RunSummary};

/// One progress line per interval, a block of totals at the end.
pub(in crate::cmd::run) struct HumanReporter {
    interval: Duration,
    last_tick: Duration,
    interval_counts: Counters,
    last_index: u64,
}

impl HumanReporter {
    pub(in crate::cmd::run) fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_tick: Duration::ZERO,
            interval_counts: Counters::default(),
            last_index: 0,
        }
    }
}

impl Reporter for HumanReporter {
    fn on_outcome(&mut self, outcome: &RequestOutcome, _elapsed: Duration) {
        self.interval_counts.apply(outcome);
        self.last_index = self.last_index.max(outcome.index);
    }

    fn on_tick(&mut self, elapsed: Duration) {
        if elapsed.saturating_sub(self.last_tick) < self.interval {
            return;
        }
        self.last_tick = elapsed;

        let c = &self.interval_counts;
        let rps = c.total as f64 / self.interval.as_secs_f64();

        println!(
            "t={:.1}s idx={} rps={:.1} ok={} http_fail={} transport_fail={} timeout={} dropped={} cancelled={}",
            elapsed.as_secs_f64(),
            self.last_index,
            rps,
            c.ok,
            c.http_fail,
            c.transport_fail,
            c.timeout,
            c.dropped,
            c.cancelled,
        );

        self.interval_counts = Counters::default();
    }

    fn finish(&mut self, summary: &RunSummary) {
        println!(
            "done in {:.1}s{}: dispatched={} ok={} http_fail={} transport_fail={} timeout={} dropped={} cancelled={} failure_ratio={:.3}",
            summary.elapsed.as_secs_f64(),
            if summary.cancelled { " (cancelled)" } else { "" },
            summary.dispatched,
            summary.succeeded,
            summary.failed_http,
            summary.failed_transport,
            summary.timed_out,
            summary.dropped,
            summary.cancelled_requests,
            summary.failure_ratio(),
        );

        if summary.warmup_requests > 0 {
            println!("warmup: {} requests (excluded above)", summary.warmup_requests);
        }

        match &summary.latency {
            Some(l) => println!(
                "latency (n={}): min={:.1}ms mean={:.1}ms p50={:.1}ms p90={:.1}ms p95={:.1}ms p99={:.1}ms max={:.1}ms",
                l.count, l.min_ms, l.mean_ms, l.p50_ms, l.p90_ms, l.p95_ms, l.p99_ms, l.max_ms,
            ),
            None => println!("latency: no completed requests"),
        }
    }
}
