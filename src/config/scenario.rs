use super::{ClientConfig, OverflowPolicy, ServerConfig};

/// High level load scenarios.
/// Each scenario is a preset of client and mock-server behavior;
/// explicitly passed flags overwrite preset values.
#[derive(Debug, Clone, Copy, clap::ValueEnum, Default)]
pub enum Scenario {
    /// Steady high rate against a healthy endpoint.
    /// Used to measure baseline throughput and latency.
    #[default]
    Baseline,

    /// Moderate rate with a deliberately undersized worker pool and
    /// queueing enabled. Used to observe queue formation and tail latency.
    TailLatency,

    /// Unstable upstream behavior.
    /// Used to exercise failure accounting and timeout handling.
    FlakyUpstream,
}

impl Scenario {
    /// Construct the concrete client configuration
    /// associated with this scenario.
    pub fn client_config(self) -> ClientConfig {
        match self {
            Scenario::Baseline => ClientConfig {
                target_rps: Some(1_000),
                pre_allocated: Some(200),
                max_workers: Some(500),
                queue_depth: None,
                overflow: Some(OverflowPolicy::Drop),
                burst_size: Some(1),
                jitter: None,
                request_timeout: None,
                expected_status: Some(200),
            },

            Scenario::TailLatency => ClientConfig {
                target_rps: Some(500),
                pre_allocated: Some(20),
                max_workers: Some(100),
                queue_depth: Some(200),
                overflow: Some(OverflowPolicy::Queue),
                burst_size: Some(2),
                jitter: Some(0.005),
                request_timeout: None,
                expected_status: Some(200),
            },

            Scenario::FlakyUpstream => ClientConfig {
                target_rps: Some(250),
                pre_allocated: Some(10),
                max_workers: Some(50),
                queue_depth: None,
                overflow: Some(OverflowPolicy::Drop),
                burst_size: Some(2),
                jitter: Some(0.01),
                request_timeout: Some(5.),
                expected_status: Some(200),
            },
        }
    }

    /// Construct the concrete mock-server configuration
    /// associated with this scenario.
    pub fn server_config(self) -> ServerConfig {
        match self {
            Scenario::Baseline => {
                // Fast and fully reliable upstream.
                ServerConfig {
                    base_latency: Some(0.02),
                    latency_jitter: None,
                    error_rate: None,
                    stall_rate: None,
                }
            }

            Scenario::TailLatency => {
                // Processing time varies per request.
                // This is the main source of tail latency.
                ServerConfig {
                    base_latency: Some(0.05),
                    latency_jitter: Some(0.1),
                    error_rate: None,
                    stall_rate: None,
                }
            }

            Scenario::FlakyUpstream => {
                // Occasionally errors or stalls.
                ServerConfig {
                    base_latency: Some(0.1),
                    latency_jitter: Some(0.2),
                    error_rate: Some(0.05),
                    stall_rate: Some(0.05),
                }
            }
        }
    }
}
