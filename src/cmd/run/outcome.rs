use std::time::Duration;

use serde::Serialize;

/// Classification of a finished dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Response received with the expected status code.
    Ok,
    /// Response received with an unexpected status code.
    HttpStatus,
    /// Connect, DNS or mid-request transport failure.
    Transport,
    /// The per-request timeout expired.
    Timeout,
    /// Dispatch discarded by the overflow policy before reaching a worker.
    Dropped,
    /// Request aborted by run cancellation.
    Cancelled,
}

impl OutcomeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeKind::Ok => "ok",
            OutcomeKind::HttpStatus => "http_status",
            OutcomeKind::Transport => "transport",
            OutcomeKind::Timeout => "timeout",
            OutcomeKind::Dropped => "dropped",
            OutcomeKind::Cancelled => "cancelled",
        }
    }
}

/// Result of a single dispatch attempt.
///
/// Created by the worker (or by the dispatcher, for overflow drops) and
/// emitted exactly once per attempt. Owned by the collector afterwards.
#[derive(Debug)]
pub struct RequestOutcome {
    /// Monotonic dispatch counter, assigned at emission time.
    pub index: u64,
    /// Whether the dispatch happened during the warmup window.
    pub warmup: bool,
    pub kind: OutcomeKind,
    /// Status code of the response, when one was received at all.
    pub status: Option<u16>,
    /// Time from pickup by a worker to completion.
    /// `None` for attempts that never reached the transport.
    pub latency: Option<Duration>,
}

/// Latency distribution of requests that completed an HTTP exchange.
#[derive(Debug, Clone, Serialize)]
pub struct LatencySummary {
    pub count: u64,
    pub min_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

/// Aggregated view of a finished run.
///
/// Built incrementally by the collector, immutable once finalized.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// All dispatch attempts, admitted or dropped, excluding warmup.
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed_http: u64,
    pub failed_transport: u64,
    pub timed_out: u64,
    pub dropped: u64,
    pub cancelled_requests: u64,
    /// Dispatch attempts during the warmup window, counted but not
    /// otherwise reflected in the statistics above.
    pub warmup_requests: u64,
    /// Whether the run was cut short by a cancel signal or drain timeout.
    pub cancelled: bool,
    pub elapsed: Duration,
    pub latency: Option<LatencySummary>,
}

impl RunSummary {
    pub fn failed(&self) -> u64 {
        self.failed_http + self.failed_transport + self.timed_out + self.dropped
            + self.cancelled_requests
    }

    /// Share of non-warmup dispatches that did not succeed.
    /// Zero when nothing was dispatched.
    pub fn failure_ratio(&self) -> f64 {
        if self.dispatched == 0 {
            0.0
        } else {
            self.failed() as f64 / self.dispatched as f64
        }
    }
}
