use std::time::Duration;

use super::{Counters, Reporter};
use crate::cmd::run::outcome::{RequestOutcome, RunSummary};

/// Machine-readable JSONL: optional per-request events, interval summaries,
/// and a final record embedding the full run summary.
pub(in crate::cmd::run) struct JsonlReporter {
    interval: Duration,
    last_tick: Duration,
    interval_counts: Counters,
    emit_events: bool,
}

impl JsonlReporter {
    pub(in crate::cmd::run) fn new(interval: Duration, emit_events: bool) -> Self {
        Self {
            interval,
            last_tick: Duration::ZERO,
            interval_counts: Counters::default(),
            emit_events,
        }
    }
}

impl Reporter for JsonlReporter {
    fn on_outcome(&mut self, outcome: &RequestOutcome, elapsed: Duration) {
        self.interval_counts.apply(outcome);

        if self.emit_events {
            let line = serde_json::json!({
                "type": "event",
                "t_ms": elapsed.as_millis() as u64,
                "index": outcome.index,
                "warmup": outcome.warmup,
                "kind": outcome.kind.as_str(),
                "status": outcome.status,
                "latency_ms": outcome.latency.map(|l| l.as_secs_f64() * 1_000.0),
            });
            println!("{line}");
        }
    }

    fn on_tick(&mut self, elapsed: Duration) {
        if elapsed.saturating_sub(self.last_tick) < self.interval {
            return;
        }
        self.last_tick = elapsed;

        let interval_secs = self.interval.as_secs_f64();
        let rps = if interval_secs == 0. {
            0.
        } else {
            self.interval_counts.total as f64 / interval_secs
        };

        let c = &self.interval_counts;
        let line = serde_json::json!({
            "type": "summary",
            "t_ms": elapsed.as_millis() as u64,
            "interval_ms": self.interval.as_millis() as u64,
            "rps": rps,
            "interval": {
                "total": c.total,
                "ok": c.ok,
                "http_fail": c.http_fail,
                "transport_fail": c.transport_fail,
                "timeout": c.timeout,
                "dropped": c.dropped,
                "cancelled": c.cancelled,
            },
        });
        println!("{line}");

        self.interval_counts = Counters::default();
    }

    fn finish(&mut self, summary: &RunSummary) {
        let line = serde_json::json!({
            "type": "final",
            "summary": summary,
        });
        println!("{line}");
    }
}
