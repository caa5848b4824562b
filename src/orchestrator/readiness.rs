//! Backend readiness gate.
//!
//! Polls the backend health endpoint until it answers with a 2xx status,
//! the deadline passes, or the session is cancelled. The gate never fails
//! the session: a timeout only produces a warning and startup continues.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ReadinessConfig;

/// Upper bound for a single health request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Outcome of one readiness gate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthCheck {
    /// Whether the backend reported healthy.
    pub ready: bool,
    /// Time from the first poll until the outcome was determined.
    pub elapsed: Duration,
    /// Number of requests issued.
    pub polls: u32,
}

/// Health endpoint poller.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    client: reqwest::Client,
    url: String,
    interval: Duration,
    timeout: Duration,
}

impl ReadinessGate {
    /// Gate for `health_url` using the profile's interval and timeout.
    #[must_use]
    pub fn new(health_url: impl Into<String>, config: &ReadinessConfig) -> Self {
        Self::with_timing(health_url, config.interval(), config.timeout())
    }

    /// Gate with explicit timing.
    #[must_use]
    pub fn with_timing(
        health_url: impl Into<String>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        // Loopback only; proxy variables from the environment must not apply.
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                warn!(%err, "failed to configure health client, using defaults");
                reqwest::Client::new()
            });
        Self {
            client,
            url: health_url.into(),
            interval,
            timeout,
        }
    }

    /// Health URL being polled.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Poll until healthy, timed out, or `cancel` fires.
    ///
    /// Network errors and non-2xx responses are retried after the poll
    /// interval. A cancelled or timed-out run reports `ready: false`.
    pub async fn wait(&self, cancel: &CancellationToken) -> HealthCheck {
        let start = Instant::now();
        let mut polls = 0_u32;

        while start.elapsed() < self.timeout {
            polls += 1;
            let remaining = self.timeout.saturating_sub(start.elapsed());
            let probe = tokio::time::timeout(remaining, self.probe());
            let healthy = tokio::select! {
                () = cancel.cancelled() => return self.cancelled(start, polls),
                result = probe => result.unwrap_or(false),
            };
            if healthy {
                let elapsed = start.elapsed();
                info!(
                    url = %self.url,
                    polls,
                    ?elapsed,
                    "backend is healthy"
                );
                return HealthCheck {
                    ready: true,
                    elapsed,
                    polls,
                };
            }
            tokio::select! {
                () = cancel.cancelled() => return self.cancelled(start, polls),
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        let elapsed = start.elapsed();
        warn!(
            url = %self.url,
            polls,
            ?elapsed,
            "backend did not become healthy; continuing anyway"
        );
        HealthCheck {
            ready: false,
            elapsed,
            polls,
        }
    }

    async fn probe(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                debug!(status = %resp.status(), "health check not ready");
                false
            }
            Err(err) => {
                debug!(%err, "health check failed");
                false
            }
        }
    }

    fn cancelled(&self, start: Instant, polls: u32) -> HealthCheck {
        debug!(url = %self.url, polls, "readiness gate cancelled");
        HealthCheck {
            ready: false,
            elapsed: start.elapsed(),
            polls,
        }
    }
}
