//! Backend health reports produced by the adapters.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Binary liveness of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    /// The probe completed.
    Up,
    /// The probe failed or timed out.
    Down,
}

/// Backend-specific diagnostic attached to a [`HealthReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthDetail {
    /// Raw liveness reply from the cache cluster.
    Response(String),
    /// Number of distinct topics visible to the bus probe.
    TopicsCount(usize),
    /// Description of the failure.
    Error(String),
}

/// Outcome of a single health probe.
///
/// Serializes flat, e.g. `{"status":"UP","response":"PONG","latency_ms":3}`
/// or `{"status":"DOWN","error":"connection refused"}`.
///
/// # Examples
/// ```
/// use backplane::domain::{HealthReport, HealthStatus};
///
/// let report = HealthReport::down("");
/// assert_eq!(report.status(), HealthStatus::Down);
/// assert!(!report.error().unwrap_or_default().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    status: HealthStatus,
    #[serde(flatten)]
    detail: HealthDetail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
}

impl HealthReport {
    /// A healthy cache probe carrying the server's reply.
    pub fn up_with_response(response: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Up,
            detail: HealthDetail::Response(response.into()),
            latency_ms: None,
        }
    }

    /// A healthy bus probe carrying the number of distinct topics.
    #[must_use]
    pub fn up_with_topics(topics_count: usize) -> Self {
        Self {
            status: HealthStatus::Up,
            detail: HealthDetail::TopicsCount(topics_count),
            latency_ms: None,
        }
    }

    /// A failed probe. Blank descriptions are replaced so DOWN always carries
    /// a non-empty detail.
    pub fn down(error: impl Into<String>) -> Self {
        let error = error.into();
        let error = if error.trim().is_empty() {
            "unknown backend error".to_owned()
        } else {
            error
        };
        Self {
            status: HealthStatus::Down,
            detail: HealthDetail::Error(error),
            latency_ms: None,
        }
    }

    /// Attach the probe's round-trip time, in whole milliseconds.
    #[must_use]
    pub fn with_latency(mut self, elapsed: Duration) -> Self {
        self.latency_ms = Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Round-trip time of the probe, when measured.
    #[must_use]
    pub fn latency(&self) -> Option<Duration> {
        self.latency_ms.map(Duration::from_millis)
    }

    /// Probe status.
    #[must_use]
    pub fn status(&self) -> HealthStatus {
        self.status
    }

    /// Probe diagnostic.
    #[must_use]
    pub fn detail(&self) -> &HealthDetail {
        &self.detail
    }

    /// Whether the probe succeeded.
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.status == HealthStatus::Up
    }

    /// Failure description for DOWN reports.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.detail {
            HealthDetail::Error(message) => Some(message.as_str()),
            _ => None,
        }
    }
}
