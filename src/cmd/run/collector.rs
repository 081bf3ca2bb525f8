use std::time::Duration;

use hdrhistogram::Histogram;
use tokio::{sync::mpsc, time::Instant};

use super::{
    outcome::{LatencySummary, OutcomeKind, RequestOutcome, RunSummary},
    reporter::Reporter,
};

/// Streaming aggregation of request outcomes.
///
/// Fed by a single task, so no synchronization is needed here: workers hand
/// outcomes over the results channel and never touch these counters.
/// Latencies go into an auto-resizing HDR histogram instead of being
/// retained individually.
pub(super) struct Collector {
    dispatched: u64,
    succeeded: u64,
    failed_http: u64,
    failed_transport: u64,
    timed_out: u64,
    dropped: u64,
    cancelled_requests: u64,
    warmup_requests: u64,
    histogram: Histogram<u64>,
    finalized: bool,
}

impl Collector {
    pub(super) fn new() -> Self {
        Self {
            dispatched: 0,
            succeeded: 0,
            failed_http: 0,
            failed_transport: 0,
            timed_out: 0,
            dropped: 0,
            cancelled_requests: 0,
            warmup_requests: 0,
            // 3 significant figures, range grows as needed.
            histogram: Histogram::new(3).expect("3 significant figures is a valid precision"),
            finalized: false,
        }
    }

    /// Folds one outcome into the aggregate.
    ///
    /// Returns `false` for outcomes arriving after finalization; those are
    /// logged and otherwise ignored.
    pub(super) fn record(&mut self, outcome: &RequestOutcome) -> bool {
        if self.finalized {
            tracing::warn!(
                index = outcome.index,
                kind = outcome.kind.as_str(),
                "late outcome after finalization: ignored",
            );
            return false;
        }

        if outcome.warmup {
            self.warmup_requests += 1;
            return true;
        }

        self.dispatched += 1;
        match outcome.kind {
            OutcomeKind::Ok => self.succeeded += 1,
            OutcomeKind::HttpStatus => self.failed_http += 1,
            OutcomeKind::Transport => self.failed_transport += 1,
            OutcomeKind::Timeout => self.timed_out += 1,
            OutcomeKind::Dropped => self.dropped += 1,
            OutcomeKind::Cancelled => self.cancelled_requests += 1,
        }

        // Only full HTTP exchanges contribute to the latency distribution.
        if matches!(outcome.kind, OutcomeKind::Ok | OutcomeKind::HttpStatus) {
            if let Some(latency) = outcome.latency {
                self.histogram
                    .saturating_record(latency.as_micros() as u64);
            }
        }

        true
    }

    /// Seals the aggregate into an immutable summary snapshot.
    pub(super) fn finalize(&mut self, elapsed: Duration, cancelled: bool) -> RunSummary {
        self.finalized = true;

        RunSummary {
            dispatched: self.dispatched,
            succeeded: self.succeeded,
            failed_http: self.failed_http,
            failed_transport: self.failed_transport,
            timed_out: self.timed_out,
            dropped: self.dropped,
            cancelled_requests: self.cancelled_requests,
            warmup_requests: self.warmup_requests,
            cancelled,
            elapsed,
            latency: latency_summary(&self.histogram),
        }
    }
}

fn latency_summary(h: &Histogram<u64>) -> Option<LatencySummary> {
    if h.is_empty() {
        return None;
    }

    let ms = |micros: u64| micros as f64 / 1_000.0;

    Some(LatencySummary {
        count: h.len(),
        min_ms: ms(h.min()),
        mean_ms: h.mean() / 1_000.0,
        p50_ms: ms(h.value_at_quantile(0.50)),
        p90_ms: ms(h.value_at_quantile(0.90)),
        p95_ms: ms(h.value_at_quantile(0.95)),
        p99_ms: ms(h.value_at_quantile(0.99)),
        max_ms: ms(h.max()),
    })
}

/// Drains the results channel until every sender is gone.
///
/// Runs as its own task so aggregation is single-writer; hands the collector
/// and reporter back for finalization once the channel closes.
pub(super) async fn collect_worker(
    mut collector: Collector,
    mut result_rx: mpsc::Receiver<RequestOutcome>,
    mut reporter: Box<dyn Reporter>,
) -> (Collector, Box<dyn Reporter>) {
    let start = Instant::now();

    while let Some(outcome) = result_rx.recv().await {
        let elapsed = start.elapsed();
        reporter.on_outcome(&outcome, elapsed);
        collector.record(&outcome);
        reporter.on_tick(elapsed);
    }

    tracing::debug!("result senders closed: collector done");
    (collector, reporter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn outcome(kind: OutcomeKind, latency_ms: Option<u64>) -> RequestOutcome {
        RequestOutcome {
            index: 0,
            warmup: false,
            kind,
            status: None,
            latency: latency_ms.map(Duration::from_millis),
        }
    }

    #[test]
    fn aggregates_outcome_kinds_separately() {
        let mut c = Collector::new();

        for _ in 0..6 {
            c.record(&outcome(OutcomeKind::Ok, Some(10)));
        }
        c.record(&outcome(OutcomeKind::HttpStatus, Some(12)));
        c.record(&outcome(OutcomeKind::Transport, Some(5)));
        c.record(&outcome(OutcomeKind::Timeout, Some(30)));
        c.record(&outcome(OutcomeKind::Dropped, None));

        let summary = c.finalize(Duration::from_secs(1), false);
        assert_eq!(summary.dispatched, 10);
        assert_eq!(summary.succeeded, 6);
        assert_eq!(summary.failed_http, 1);
        assert_eq!(summary.failed_transport, 1);
        assert_eq!(summary.timed_out, 1);
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.failed(), 4);
        assert!((summary.failure_ratio() - 0.4).abs() < 1e-9);

        // Timeouts and transport failures stay out of the distribution.
        let latency = summary.latency.expect("latency summary");
        assert_eq!(latency.count, 7);
        assert!(latency.min_ms >= 10.0);
        assert!(latency.max_ms >= latency.min_ms);
    }

    #[test]
    fn warmup_outcomes_do_not_skew_the_summary() {
        let mut c = Collector::new();

        let mut o = outcome(OutcomeKind::Ok, Some(10));
        o.warmup = true;
        c.record(&o);
        c.record(&outcome(OutcomeKind::Ok, Some(20)));

        let summary = c.finalize(Duration::from_secs(1), false);
        assert_eq!(summary.warmup_requests, 1);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(summary.succeeded, 1);
    }

    #[test]
    fn no_completed_requests_means_no_latency_summary() {
        let mut c = Collector::new();
        c.record(&outcome(OutcomeKind::Dropped, None));

        let summary = c.finalize(Duration::from_secs(1), false);
        assert!(summary.latency.is_none());
    }

    #[traced_test]
    #[test]
    fn late_outcomes_are_rejected_after_finalization() {
        let mut c = Collector::new();
        c.record(&outcome(OutcomeKind::Ok, Some(10)));

        let summary = c.finalize(Duration::from_secs(1), false);
        assert_eq!(summary.succeeded, 1);

        assert!(!c.record(&outcome(OutcomeKind::Ok, Some(10))));
        assert!(logs_contain("late outcome after finalization"));
    }

    #[test]
    fn cancellation_is_flagged_on_the_summary() {
        let mut c = Collector::new();
        c.record(&outcome(OutcomeKind::Cancelled, None));

        let summary = c.finalize(Duration::from_millis(500), true);
        assert!(summary.cancelled);
        assert_eq!(summary.cancelled_requests, 1);
    }
}
