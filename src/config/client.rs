use clap::ValueEnum;

/// What happens to a dispatch signal when every worker is busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OverflowPolicy {
    /// Discard the dispatch and count it as dropped.
    Drop,
    /// Buffer the dispatch, bounded by the queue depth.
    Queue,
}

/// Client side load generation configuration.
/// This models how requests are produced over time.
#[derive(Debug, Clone, clap::Args, Default)]
pub struct ClientConfig {
    /// Target average requests per second.
    #[arg(long, value_name = "N")]
    pub target_rps: Option<u32>,

    /// Workers started before the first dispatch.
    #[arg(long, value_name = "N")]
    pub pre_allocated: Option<u32>,

    /// Hard cap on concurrent in-flight requests.
    #[arg(long, value_name = "N")]
    pub max_workers: Option<u32>,

    /// Dispatch signals buffered while all workers are busy.
    /// Only meaningful with the queue overflow policy.
    #[arg(long, value_name = "N")]
    pub queue_depth: Option<u32>,

    /// Overflow policy applied when the pool is saturated.
    #[arg(long, value_enum)]
    pub overflow: Option<OverflowPolicy>,

    /// Number of requests that may fire back to back when tokens allow.
    #[arg(long, value_name = "#REQUESTS")]
    pub burst_size: Option<u32>,

    /// Random multiplier on pacing sleeps.
    /// Models uneven producers and event loop jitter.
    #[arg(long)]
    pub jitter: Option<f64>,

    /// Per-request timeout.
    #[arg(long, value_name = "SECONDS")]
    pub request_timeout: Option<f64>,

    /// Status code counted as a success.
    #[arg(long, value_name = "CODE")]
    pub expected_status: Option<u16>,
}
