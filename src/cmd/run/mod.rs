use std::{sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Args;
use tokio::{
    sync::mpsc,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::config::{self, ClientConfig, RunConfig, Scenario};

mod collector;
mod outcome;
mod pacer;
mod pool;
mod reporter;
mod transport;

use self::{
    collector::{Collector, collect_worker},
    outcome::RunSummary,
    pacer::ArrivalPacer,
    pool::{Job, WorkerPool},
    reporter::{HumanReporter, JsonlReporter, Reporter},
    transport::{HttpTransport, Transport},
};

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    Draining,
    Finished,
}

#[derive(Debug, Clone, Args)]
/// run a load generation session against a target
pub struct RunCommand {
    /// URL the GET requests are sent to.
    #[arg(value_name = "URL", required = true)]
    url: String,

    /// Measurement window.
    #[arg(long, value_name = "SECONDS", default_value_t = 60.)]
    duration: f64,

    /// Warmup window before measurement;
    /// its outcomes are counted but kept out of the statistics.
    #[arg(long, value_name = "SECONDS", default_value_t = 0.)]
    warmup: f64,

    /// report json instead of a human-friendly format
    #[arg(long, default_value_t = false)]
    json: bool,

    /// also emit one json line per request (implies --json)
    #[arg(long, default_value_t = false)]
    events: bool,

    /// exit non-zero when the final failure ratio exceeds this bound
    #[arg(long, value_name = "RATIO")]
    max_failure_ratio: Option<f64>,

    #[clap(flatten)]
    config: Option<ClientConfig>,

    #[arg(long)]
    /// Scenario to run,
    /// manually defined parameters overwrite scenario parameters.
    scenario: Option<Scenario>,
}

pub async fn exec(
    graceful: f64,
    shutdown: CancellationToken,
    args: RunCommand,
) -> anyhow::Result<()> {
    let client_cfg = config::merged_client(args.scenario, args.config);
    let cfg = RunConfig::resolve(args.url, args.duration, args.warmup, graceful, client_cfg)
        .context("resolve run configuration")?;

    tracing::info!(
        target_rps = cfg.target_rps,
        duration_secs = cfg.duration.as_secs_f64(),
        pre_allocated = cfg.pre_allocated,
        max_workers = cfg.max_workers,
        overflow = ?cfg.overflow,
        url = %cfg.url,
        "run configuration ready",
    );

    let transport = Arc::new(
        HttpTransport::new(cfg.request_timeout, cfg.max_workers)
            .context("create http transport")?,
    );

    const REPORT_INTERVAL: Duration = Duration::from_secs(1);
    let reporter: Box<dyn Reporter> = if args.json || args.events {
        Box::new(JsonlReporter::new(REPORT_INTERVAL, args.events))
    } else {
        Box::new(HumanReporter::new(REPORT_INTERVAL))
    };

    let summary = run_load(&cfg, transport, reporter, shutdown).await?;

    if let Some(bound) = args.max_failure_ratio {
        let ratio = summary.failure_ratio();
        if ratio > bound {
            anyhow::bail!("failure ratio {ratio:.3} exceeded the configured bound {bound:.3}");
        }
    }

    Ok(())
}

/// Drives one full run: pace dispatches, execute them through the pool,
/// aggregate outcomes, drain, and seal the summary.
///
/// The pacer is the only producer and never waits on workers; saturation is
/// absorbed by the pool's overflow policy. `shutdown` stops dispatching
/// immediately and lets the drain window finish what is already in flight.
async fn run_load(
    cfg: &RunConfig,
    transport: Arc<dyn Transport>,
    reporter: Box<dyn Reporter>,
    shutdown: CancellationToken,
) -> anyhow::Result<RunSummary> {
    let mut state = RunState::Idle;
    tracing::debug!(?state, "run assembled");

    let (result_tx, result_rx) = mpsc::channel(cfg.max_workers.max(1) * 8);
    let collect = tokio::spawn(collect_worker(Collector::new(), result_rx, reporter));

    let abort = CancellationToken::new();
    let mut pool = WorkerPool::new(cfg, transport, result_tx, abort);

    let mut pacer = ArrivalPacer::new(cfg.target_rps, cfg.burst_size, cfg.jitter);

    let start = Instant::now();
    let warmup_until = start + cfg.warmup;
    let deadline = warmup_until + cfg.duration;

    state = RunState::Running;
    tracing::debug!(?state, "pacer started");

    let mut index = 0u64;
    let mut cancelled = false;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("cancellation requested: stop dispatching");
                cancelled = true;
                break;
            }
            _ = time::sleep_until(deadline) => break,
            _ = pacer.tick() => {
                let job = Job {
                    index,
                    warmup: Instant::now() < warmup_until,
                };
                index += 1;
                pool.dispatch(job).await;
            }
        }
    }

    state = RunState::Draining;
    tracing::debug!(?state, drain_timeout = ?cfg.drain_timeout, "dispatching stopped");

    let drain_cut_short = pool.drain(cfg.drain_timeout).await;

    let (mut collector, mut reporter) = collect.await.context("join collector task")?;
    let summary = collector.finalize(start.elapsed(), cancelled || drain_cut_short);

    state = RunState::Finished;
    tracing::debug!(?state, dispatched = summary.dispatched, "run complete");

    reporter.finish(&summary);
    Ok(summary)
}
