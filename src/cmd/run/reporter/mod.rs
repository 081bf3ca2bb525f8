mod human;
mod json;

pub(super) use self::{human::HumanReporter, json::JsonlReporter};

use std::time::Duration;

use super::outcome::{OutcomeKind, RequestOutcome, RunSummary};

/// Streams run progress while the collector aggregates.
///
/// Driven from the collector task: one `on_outcome` per result, `on_tick`
/// after each (implementations decide whether the interval elapsed), and
/// `finish` once with the sealed summary.
pub(super) trait Reporter: Send + 'static {
    fn on_outcome(&mut self, outcome: &RequestOutcome, elapsed: Duration);
    fn on_tick(&mut self, elapsed: Duration);
    fn finish(&mut self, summary: &RunSummary);
}

/// Counters for one reporting interval.
#[derive(Default)]
pub(super) struct Counters {
    total: u64,
    ok: u64,
    http_fail: u64,
    transport_fail: u64,
    timeout: u64,
    dropped: u64,
    cancelled: u64,
}

impl Counters {
    pub(super) fn apply(&mut self, outcome: &RequestOutcome) {
        self.total += 1;
        match outcome.kind {
            OutcomeKind::Ok => self.ok += 1,
            OutcomeKind::HttpStatus => self.http_fail += 1,
            OutcomeKind::Transport => self.transport_fail += 1,
            OutcomeKind::Timeout => self.timeout += 1,
            OutcomeKind::Dropped => self.dropped += 1,
            OutcomeKind::Cancelled => self.cancelled += 1,
        }
    }
}

/// Reporter that swallows everything; used where progress output
/// would only be noise.
#[cfg(test)]
pub(super) struct NoopReporter;

#[cfg(test)]
impl Reporter for NoopReporter {
    fn on_outcome(&mut self, _outcome: &RequestOutcome, _elapsed: Duration) {}
    fn on_tick(&mut self, _elapsed: Duration) {}
    fn finish(&mut self, _summary: &RunSummary) {}
}
