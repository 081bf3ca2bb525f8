mod client;
mod scenario;
mod server;

pub use self::{
    client::{ClientConfig, OverflowPolicy},
    scenario::Scenario,
    server::ServerConfig,
};

use std::time::Duration;

use crate::error::ConfigError;

/// Overlays explicitly passed values on top of a scenario preset,
/// field by field. Explicit always wins.
macro_rules! overlay_config {
    ($preset:ident, $overwrite:ident, $ty:ident, {$($property:ident),+ $(,)?}) => {
        $ty {
            $(
                $property: match ($overwrite.$property, $preset.$property) {
                    (Some(value), _) => {
                        tracing::debug!(
                            "property '{}': explicit value {value:?}",
                            stringify!($property),
                        );
                        Some(value)
                    }
                    (None, preset) => preset,
                },
            )+
        }
    };
}

pub fn merged_client(scenario: Option<Scenario>, overwrite: Option<ClientConfig>) -> ClientConfig {
    let preset = scenario.map(Scenario::client_config).unwrap_or_default();
    let overwrite = overwrite.unwrap_or_default();

    overlay_config!(
        preset, overwrite, ClientConfig,
        {
            target_rps,
            pre_allocated,
            max_workers,
            queue_depth,
            overflow,
            burst_size,
            jitter,
            request_timeout,
            expected_status,
        }
    )
}

pub fn merged_server(scenario: Option<Scenario>, overwrite: Option<ServerConfig>) -> ServerConfig {
    let preset = scenario.map(Scenario::server_config).unwrap_or_default();
    let overwrite = overwrite.unwrap_or_default();

    overlay_config!(
        preset, overwrite, ServerConfig,
        {
            base_latency,
            latency_jitter,
            error_rate,
            stall_rate,
        }
    )
}

/// Resolved and validated run parameters. Immutable once the run starts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub target_rps: u32,
    pub duration: Duration,
    pub warmup: Duration,
    pub pre_allocated: usize,
    pub max_workers: usize,
    pub queue_depth: usize,
    pub overflow: OverflowPolicy,
    pub burst_size: u32,
    pub jitter: f64,
    pub url: String,
    pub expected_status: u16,
    pub request_timeout: Duration,
    /// Upper bound on the drain window after dispatching stops.
    /// `None` waits for every in-flight request.
    pub drain_timeout: Option<Duration>,
}

impl RunConfig {
    /// Fills unset knobs with the defaults and validates the result.
    ///
    /// The defaults match the profile the tool is typically pointed at a
    /// healthy service with: 1000 requests per second for a minute, with a
    /// 200 to 500 worker envelope, expecting plain 200s.
    pub fn resolve(
        url: String,
        duration_secs: f64,
        warmup_secs: f64,
        drain_secs: f64,
        client: ClientConfig,
    ) -> Result<Self, ConfigError> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(ConfigError::ZeroDuration);
        }

        let request_timeout_secs = client.request_timeout.unwrap_or(30.0);
        if !request_timeout_secs.is_finite() || request_timeout_secs <= 0.0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let max_workers = client.max_workers.unwrap_or(500) as usize;

        let cfg = Self {
            target_rps: client.target_rps.unwrap_or(1_000),
            duration: Duration::from_secs_f64(duration_secs),
            warmup: if warmup_secs.is_finite() && warmup_secs > 0.0 {
                Duration::from_secs_f64(warmup_secs)
            } else {
                Duration::ZERO
            },
            pre_allocated: client.pre_allocated.unwrap_or(200) as usize,
            max_workers,
            queue_depth: client
                .queue_depth
                .map(|d| d as usize)
                .unwrap_or(max_workers),
            overflow: client.overflow.unwrap_or(OverflowPolicy::Drop),
            burst_size: client.burst_size.unwrap_or(1).max(1),
            jitter: client.jitter.unwrap_or(0.0).clamp(0.0, 1.0),
            url,
            expected_status: client.expected_status.unwrap_or(200),
            request_timeout: Duration::from_secs_f64(request_timeout_secs),
            drain_timeout: (drain_secs.is_finite() && drain_secs > 0.0)
                .then(|| Duration::from_secs_f64(drain_secs)),
        };

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_rps == 0 {
            return Err(ConfigError::ZeroRate);
        }

        if self.max_workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }

        if self.pre_allocated > self.max_workers {
            return Err(ConfigError::WorkerBounds {
                pre_allocated: self.pre_allocated,
                max_workers: self.max_workers,
            });
        }

        if !(100..=599).contains(&self.expected_status) {
            return Err(ConfigError::InvalidStatus(self.expected_status));
        }

        let parsed = reqwest::Url::parse(&self.url).map_err(|err| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: err.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(url: &str, duration: f64, client: ClientConfig) -> Result<RunConfig, ConfigError> {
        RunConfig::resolve(url.into(), duration, 0.0, 30.0, client)
    }

    #[test]
    fn defaults_fill_the_unset_knobs() {
        let cfg = resolve("http://localhost:8080/api/info", 60.0, ClientConfig::default())
            .expect("valid config");

        assert_eq!(cfg.target_rps, 1_000);
        assert_eq!(cfg.pre_allocated, 200);
        assert_eq!(cfg.max_workers, 500);
        assert_eq!(cfg.queue_depth, 500);
        assert_eq!(cfg.overflow, OverflowPolicy::Drop);
        assert_eq!(cfg.expected_status, 200);
        assert_eq!(cfg.drain_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn rejects_degenerate_values() {
        let zero_rate = ClientConfig {
            target_rps: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            resolve("http://localhost/", 60.0, zero_rate),
            Err(ConfigError::ZeroRate)
        ));

        assert!(matches!(
            resolve("http://localhost/", 0.0, ClientConfig::default()),
            Err(ConfigError::ZeroDuration)
        ));

        let no_workers = ClientConfig {
            max_workers: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            resolve("http://localhost/", 60.0, no_workers),
            Err(ConfigError::ZeroWorkers)
        ));

        let inverted = ClientConfig {
            pre_allocated: Some(10),
            max_workers: Some(5),
            ..Default::default()
        };
        assert!(matches!(
            resolve("http://localhost/", 60.0, inverted),
            Err(ConfigError::WorkerBounds { .. })
        ));

        let bad_status = ClientConfig {
            expected_status: Some(42),
            ..Default::default()
        };
        assert!(matches!(
            resolve("http://localhost/", 60.0, bad_status),
            Err(ConfigError::InvalidStatus(42))
        ));

        assert!(matches!(
            resolve("not a url", 60.0, ClientConfig::default()),
            Err(ConfigError::InvalidUrl { .. })
        ));

        assert!(matches!(
            resolve("ftp://localhost/", 60.0, ClientConfig::default()),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn explicit_flags_overwrite_scenario_presets() {
        let merged = merged_client(
            Some(Scenario::Baseline),
            Some(ClientConfig {
                target_rps: Some(50),
                ..Default::default()
            }),
        );

        assert_eq!(merged.target_rps, Some(50));
        // Untouched knobs keep the preset values.
        assert_eq!(merged.max_workers, Some(500));
        assert_eq!(merged.pre_allocated, Some(200));
    }

    #[test]
    fn no_scenario_means_no_preset() {
        let merged = merged_client(None, None);
        assert!(merged.target_rps.is_none());
        assert!(merged.max_workers.is_none());
    }

    #[test]
    fn jitter_is_clamped_not_rejected() {
        let cfg = resolve(
            "http://localhost/",
            1.0,
            ClientConfig {
                jitter: Some(7.5),
                ..Default::default()
            },
        )
        .expect("valid config");

        assert_eq!(cfg.jitter, 1.0);
    }
}
