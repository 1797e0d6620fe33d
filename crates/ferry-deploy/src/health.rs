//! Post-deploy health probe.
//!
//! One `GET`, no retries. Only `200 OK` counts as healthy.

use std::time::Duration;

use ferry_common::error::{FerryError, Result};
use reqwest::StatusCode;
use serde::Serialize;

/// Outcome of a health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum HealthStatus {
    /// The endpoint answered `200`.
    Passed {
        /// Probed URL.
        url: String,
    },
    /// Any other status, or no answer at all.
    Failed {
        /// Probed URL.
        url: String,
        /// HTTP status, when a response arrived.
        status: Option<u16>,
        /// Human-readable cause.
        reason: String,
    },
}

impl HealthStatus {
    /// Whether the probe passed.
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }

    /// Converts a failed probe into [`FerryError::HealthCheck`].
    ///
    /// # Errors
    ///
    /// Returns an error if the probe failed.
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Passed { .. } => Ok(()),
            Self::Failed { url, reason, .. } => Err(FerryError::HealthCheck { url, reason }),
        }
    }
}

/// Blocking HTTP health prober.
#[derive(Debug, Clone)]
pub struct HealthChecker {
    client: reqwest::blocking::Client,
}

impl HealthChecker {
    /// Creates a prober whose single request gives up after `timeout`.
    ///
    /// Redirects are not followed; a `3xx` from the endpoint is a failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("ferry/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FerryError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// Issues one `GET` to `url`.
    pub fn probe(&self, url: &str) -> HealthStatus {
        tracing::info!(url, "probing health endpoint");
        match self.client.get(url).send() {
            Ok(response) if response.status() == StatusCode::OK => {
                tracing::info!(url, "health check passed");
                HealthStatus::Passed {
                    url: url.to_string(),
                }
            }
            Ok(response) => {
                let status = response.status();
                tracing::warn!(url, status = status.as_u16(), "health check failed");
                HealthStatus::Failed {
                    url: url.to_string(),
                    status: Some(status.as_u16()),
                    reason: format!("unexpected status {status}"),
                }
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "health check request failed");
                HealthStatus::Failed {
                    url: url.to_string(),
                    status: None,
                    reason: e.to_string(),
                }
            }
        }
    }
}
