use thiserror::Error;

/// Configuration problems detected before a run starts.
///
/// These are the only fatal errors: everything that goes wrong after the
/// first dispatch is recorded as a per-request outcome instead.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("target rate must be at least 1 request per second")]
    ZeroRate,

    #[error("run duration must be positive")]
    ZeroDuration,

    #[error("worker pool needs at least one worker")]
    ZeroWorkers,

    #[error("pre-allocated workers ({pre_allocated}) exceed the worker cap ({max_workers})")]
    WorkerBounds {
        pre_allocated: usize,
        max_workers: usize,
    },

    #[error("invalid target url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{0} is not a valid HTTP status code")]
    InvalidStatus(u16),

    #[error("request timeout must be positive")]
    ZeroTimeout,

    #[error("transport setup failed: {0}")]
    TransportSetup(String),
}

/// Per-request transport failures.
///
/// Recorded as a failed outcome for the request that hit them,
/// never propagated to the pacer or to other workers.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    TimedOut,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport failure: {0}")]
    Other(String),
}
