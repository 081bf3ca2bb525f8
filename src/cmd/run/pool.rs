use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use tokio::{
    sync::{Mutex, mpsc},
    time::Instant,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    config::{OverflowPolicy, RunConfig},
    error::TransportError,
};

use super::{
    outcome::{OutcomeKind, RequestOutcome},
    transport::Transport,
};

/// One unit of work: a single GET against the configured target.
#[derive(Debug, Clone, Copy)]
pub(super) struct Job {
    pub(super) index: u64,
    pub(super) warmup: bool,
}

/// Elastic pool of worker tasks behind a bounded dispatch queue.
///
/// `pre_allocated` workers are spawned up front; more are spawned on demand
/// until `max_workers`. Each worker handles one request at a time, so the
/// worker count is the in-flight bound. When every worker is busy the
/// overflow policy decides between queueing (up to `queue_depth`) and
/// dropping. Every dispatch attempt, admitted or not, produces exactly one
/// outcome on the results channel.
pub(super) struct WorkerPool {
    shared: Arc<PoolShared>,
    dispatch_tx: mpsc::Sender<Job>,
    dispatch_rx: Arc<Mutex<mpsc::Receiver<Job>>>,
    tracker: TaskTracker,
    spawned: usize,
    max_workers: usize,
    queue_depth: usize,
    overflow: OverflowPolicy,
}

struct PoolShared {
    url: String,
    expected_status: u16,
    transport: Arc<dyn Transport>,
    result_tx: mpsc::Sender<RequestOutcome>,
    abort: CancellationToken,
    /// Jobs admitted into the pool and not yet completed.
    in_system: AtomicUsize,
}

impl WorkerPool {
    pub(super) fn new(
        cfg: &RunConfig,
        transport: Arc<dyn Transport>,
        result_tx: mpsc::Sender<RequestOutcome>,
        abort: CancellationToken,
    ) -> Self {
        let capacity = (cfg.max_workers + cfg.queue_depth).max(1);
        let (dispatch_tx, dispatch_rx) = mpsc::channel(capacity);

        let mut pool = Self {
            shared: Arc::new(PoolShared {
                url: cfg.url.clone(),
                expected_status: cfg.expected_status,
                transport,
                result_tx,
                abort,
                in_system: AtomicUsize::new(0),
            }),
            dispatch_tx,
            dispatch_rx: Arc::new(Mutex::new(dispatch_rx)),
            tracker: TaskTracker::new(),
            spawned: 0,
            max_workers: cfg.max_workers,
            queue_depth: cfg.queue_depth,
            overflow: cfg.overflow,
        };

        for _ in 0..cfg.pre_allocated {
            pool.spawn_worker();
        }

        pool
    }

    /// Routes one dispatch signal into the pool, or records it as dropped.
    ///
    /// Never waits on workers; admission is decided from the in-system count
    /// alone so the pacer is never blocked by downstream latency.
    pub(super) async fn dispatch(&mut self, job: Job) {
        let in_system = self.shared.in_system.load(Ordering::SeqCst);

        let admitted = if in_system < self.spawned {
            true
        } else if self.spawned < self.max_workers {
            self.spawn_worker();
            true
        } else {
            match self.overflow {
                OverflowPolicy::Queue => in_system - self.spawned < self.queue_depth,
                OverflowPolicy::Drop => false,
            }
        };

        if !admitted {
            tracing::trace!(index = job.index, "pool saturated: dispatch dropped");
            send_outcome(
                &self.shared,
                RequestOutcome {
                    index: job.index,
                    warmup: job.warmup,
                    kind: OutcomeKind::Dropped,
                    status: None,
                    latency: None,
                },
            )
            .await;
            return;
        }

        self.shared.in_system.fetch_add(1, Ordering::SeqCst);
        if self.dispatch_tx.send(job).await.is_err() {
            // Queue already closed; account the job back out.
            self.shared.in_system.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Stops intake and waits for the backlog to finish.
    ///
    /// When `timeout` expires first, outstanding requests are aborted and
    /// every job still in flight or queued is flushed as a cancelled
    /// outcome. Returns whether the drain had to be cut short.
    pub(super) async fn drain(self, timeout: Option<Duration>) -> bool {
        let Self {
            shared,
            dispatch_tx,
            dispatch_rx,
            tracker,
            ..
        } = self;

        drop(dispatch_tx);
        tracker.close();

        let timed_out = match timeout {
            Some(limit) => tokio::time::timeout(limit, tracker.wait()).await.is_err(),
            None => {
                tracker.wait().await;
                false
            }
        };

        if timed_out {
            tracing::warn!("drain timeout expired: aborting in-flight requests");
            shared.abort.cancel();
            tracker.wait().await;

            // Queued jobs no worker will ever pick up.
            let mut rx = dispatch_rx.lock().await;
            while let Ok(job) = rx.try_recv() {
                complete(&shared, job, OutcomeKind::Cancelled, None, None).await;
            }
        }

        timed_out
    }

    fn spawn_worker(&mut self) {
        debug_assert!(self.spawned < self.max_workers);
        self.spawned += 1;
        let shared = self.shared.clone();
        let rx = self.dispatch_rx.clone();
        self.tracker.spawn(worker_loop(shared, rx));
    }

    #[cfg(test)]
    fn spawned(&self) -> usize {
        self.spawned
    }
}

async fn worker_loop(shared: Arc<PoolShared>, rx: Arc<Mutex<mpsc::Receiver<Job>>>) {
    loop {
        let job = {
            let mut rx = rx.lock().await;
            tokio::select! {
                _ = shared.abort.cancelled() => return,
                job = rx.recv() => match job {
                    Some(job) => job,
                    None => return,
                },
            }
        };

        if shared.abort.is_cancelled() {
            complete(&shared, job, OutcomeKind::Cancelled, None, None).await;
            continue;
        }

        let started = Instant::now();
        let result = tokio::select! {
            _ = shared.abort.cancelled() => None,
            result = shared.transport.get(&shared.url) => Some(result),
        };

        let elapsed = started.elapsed();
        let (kind, status, latency) = match result {
            None => (OutcomeKind::Cancelled, None, None),
            Some(Ok(status)) if status == shared.expected_status => {
                (OutcomeKind::Ok, Some(status), Some(elapsed))
            }
            Some(Ok(status)) => (OutcomeKind::HttpStatus, Some(status), Some(elapsed)),
            Some(Err(TransportError::TimedOut)) => (OutcomeKind::Timeout, None, Some(elapsed)),
            Some(Err(err)) => {
                tracing::debug!("request failed: {err}");
                (OutcomeKind::Transport, None, Some(elapsed))
            }
        };

        complete(&shared, job, kind, status, latency).await;
    }
}

/// Emits the outcome for an admitted job and releases its pool slot.
async fn complete(
    shared: &PoolShared,
    job: Job,
    kind: OutcomeKind,
    status: Option<u16>,
    latency: Option<Duration>,
) {
    shared.in_system.fetch_sub(1, Ordering::SeqCst);
    send_outcome(
        shared,
        RequestOutcome {
            index: job.index,
            warmup: job.warmup,
            kind,
            status,
            latency,
        },
    )
    .await;
}

async fn send_outcome(shared: &PoolShared, outcome: RequestOutcome) {
    if shared.result_tx.send(outcome).await.is_err() {
        tracing::debug!("result channel closed before outcome delivery");
    }
}
