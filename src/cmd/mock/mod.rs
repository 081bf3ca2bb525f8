use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use anyhow::Context as _;
use axum::{Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use clap::Args;
use rand::Rng as _;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::{self, Scenario, ServerConfig};

#[derive(Debug, Clone, Args)]
/// run a local mock upstream to point the generator at
pub struct MockCommand {
    /// socket address to bind
    #[arg(value_name = "ADDRESS", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    #[clap(flatten)]
    config: Option<ServerConfig>,

    #[arg(long)]
    /// Scenario to emulate,
    /// manually defined parameters overwrite scenario parameters.
    scenario: Option<Scenario>,
}

/// Resolved mock behavior, sampled independently per request.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MockBehavior {
    base_latency: Duration,
    latency_jitter: Duration,
    error_rate: f32,
    stall_rate: f32,
}

impl MockBehavior {
    fn from_config(cfg: ServerConfig) -> Self {
        Self {
            base_latency: Duration::from_secs_f64(cfg.base_latency.unwrap_or(0.0).max(0.0)),
            latency_jitter: Duration::from_secs_f64(cfg.latency_jitter.unwrap_or(0.0).max(0.0)),
            error_rate: cfg.error_rate.unwrap_or(0.0).clamp(0.0, 1.0),
            stall_rate: cfg.stall_rate.unwrap_or(0.0).clamp(0.0, 1.0),
        }
    }

    #[cfg(test)]
    pub(crate) fn instant_ok() -> Self {
        Self {
            base_latency: Duration::ZERO,
            latency_jitter: Duration::ZERO,
            error_rate: 0.0,
            stall_rate: 0.0,
        }
    }
}

#[derive(Debug)]
struct MockState {
    behavior: MockBehavior,
    served: AtomicU64,
}

pub async fn exec(shutdown: CancellationToken, args: MockCommand) -> anyhow::Result<()> {
    let server_cfg = config::merged_server(args.scenario, args.config);
    let behavior = MockBehavior::from_config(server_cfg);

    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("bind mock upstream to {}", args.bind))?;
    tracing::info!(
        addr = %listener.local_addr().context("local addr")?,
        ?behavior,
        "mock upstream listening",
    );

    axum::serve(listener, router(behavior))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("serve mock upstream")
}

/// Every path gets the configured behavior;
/// `/__mock/served` reports how many requests have been answered.
pub(crate) fn router(behavior: MockBehavior) -> Router {
    let state = Arc::new(MockState {
        behavior,
        served: AtomicU64::new(0),
    });

    Router::new()
        .route("/__mock/served", get(served_counter))
        .fallback(respond)
        .with_state(state)
}

async fn respond(State(state): State<Arc<MockState>>) -> impl IntoResponse {
    let behavior = state.behavior;

    // Sample everything up front: the rng handle must not be held
    // across an await.
    let (stall, error, jitter_frac) = {
        let mut rng = rand::rng();
        (
            rng.random::<f32>() < behavior.stall_rate,
            rng.random::<f32>() < behavior.error_rate,
            rng.random::<f64>(),
        )
    };

    if stall {
        // Never answer; the client's timeout decides when to give up.
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        return StatusCode::REQUEST_TIMEOUT;
    }

    let delay = behavior.base_latency + behavior.latency_jitter.mul_f64(jitter_frac);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    state.served.fetch_add(1, Ordering::SeqCst);

    if error {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

async fn served_counter(State(state): State<Arc<MockState>>) -> impl IntoResponse {
    state.served.load(Ordering::Acquire).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn_server(behavior: MockBehavior) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router(behavior)).await.expect("serve");
        });
        addr
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn answers_ok_and_counts_served_requests() {
        let addr = spawn_server(MockBehavior::instant_ok()).await;
        let client = reqwest::Client::new();

        for _ in 0..3 {
            let resp = client
                .get(format!("http://{addr}/api/info"))
                .send()
                .await
                .expect("request");
            assert_eq!(resp.status().as_u16(), 200);
        }

        let counted = client
            .get(format!("http://{addr}/__mock/served"))
            .send()
            .await
            .expect("counter request")
            .text()
            .await
            .expect("counter body");
        assert_eq!(counted, "3");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn full_error_rate_turns_every_answer_into_a_500() {
        let behavior = MockBehavior {
            base_latency: Duration::ZERO,
            latency_jitter: Duration::ZERO,
            error_rate: 1.0,
            stall_rate: 0.0,
        };
        let addr = spawn_server(behavior).await;

        let resp = reqwest::Client::new()
            .get(format!("http://{addr}/"))
            .send()
            .await
            .expect("request");
        assert_eq!(resp.status().as_u16(), 500);
    }
}
