use std::time::Duration;

use crate::error::{ConfigError, TransportError};

/// The outbound capability the generator depends on:
/// send one GET, observe the status code or the failure.
///
/// Everything the run loop knows about HTTP goes through this seam, which
/// keeps the pool and collector testable against scripted transports.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn get(&self, url: &str) -> Result<u16, TransportError>;
}

/// Production transport on top of a pooled reqwest client.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a client with the per-request timeout baked in.
    ///
    /// `max_connections` sizes the idle connection pool to the worker cap so
    /// a saturated run does not churn sockets.
    pub fn new(timeout: Duration, max_connections: usize) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(max_connections)
            .build()
            .map_err(|err| ConfigError::TransportSetup(err.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<u16, TransportError> {
        match self.client.get(url).send().await {
            Ok(resp) => Ok(resp.status().as_u16()),
            Err(err) if err.is_timeout() => Err(TransportError::TimedOut),
            Err(err) if err.is_connect() => Err(TransportError::Connect(err.to_string())),
            Err(err) => Err(TransportError::Other(err.to_string())),
        }
    }
}
