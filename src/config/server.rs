/// Mock upstream behavior configuration.
/// This models processing cost and instability.
#[derive(Debug, Clone, clap::Args, Default)]
pub struct ServerConfig {
    /// Base processing time before responding.
    #[arg(long, value_name = "SECONDS")]
    pub base_latency: Option<f64>,

    /// Random delay added on top of base_latency.
    /// Models IO waits and backend variability.
    #[arg(long, value_name = "SECONDS")]
    pub latency_jitter: Option<f64>,

    /// Probability of answering with an error response.
    #[arg(long)]
    pub error_rate: Option<f32>,

    /// Probability of stalling past any client timeout.
    #[arg(long)]
    pub stall_rate: Option<f32>,
}
