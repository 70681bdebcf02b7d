//! Health endpoints.
//!
//! `/health` aggregates both backend probes for humans and dashboards;
//! `/health/live` and `/health/ready` are cheap orchestration probes that
//! never touch a backend.

use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{HttpResponse, get, http::header, web};
use chrono::{SecondsFormat, Utc};
use futures_util::join;
use serde::Serialize;

use super::state::HttpState;
use crate::domain::HealthReport;

/// Shared health state for readiness and liveness checks.
/// Track readiness and whether the process should report itself as alive to orchestrators.
pub struct HealthState {
    ready: AtomicBool,
    live: AtomicBool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            ready: AtomicBool::new(false),
            live: AtomicBool::new(true),
        }
    }
}

impl HealthState {
    /// Create a new health state starting as not ready but live.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the service as ready.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Flag the service as unhealthy so liveness checks fail fast during shutdown.
    pub fn mark_unhealthy(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Return readiness state.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Return liveness state. When false, liveness probes emit 503 to trigger restarts.
    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn probe_response(probe_ok: bool) -> HttpResponse {
        let mut response = if probe_ok {
            HttpResponse::Ok()
        } else {
            HttpResponse::ServiceUnavailable()
        };

        response
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .finish()
    }
}

/// Per-backend section of the aggregate report.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// Cache cluster probe.
    pub redis: HealthReport,
    /// Event bus probe.
    pub kafka: HealthReport,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct AggregateHealth {
    /// Always `"UP"` while the façade answers; backend state is in `checks`.
    pub status: &'static str,
    /// Service name.
    pub service: String,
    /// Report time, RFC 3339 in UTC.
    pub timestamp: String,
    /// One report per backend.
    pub checks: HealthChecks,
}

/// Aggregate health. Both probes run concurrently and each is bounded by its
/// adapter's own deadline.
///
/// ```text
/// GET /health
/// {"status":"UP","service":"backplane","timestamp":"…",
///  "checks":{"redis":{"status":"UP","response":"PONG"},
///            "kafka":{"status":"DOWN","error":"…"}}}
/// ```
#[get("/health")]
pub async fn health(state: web::Data<HttpState>) -> HttpResponse {
    let (redis, kafka) = join!(state.cache.health_check(), state.events.health_check());
    HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(AggregateHealth {
            status: "UP",
            service: state.service.clone(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            checks: HealthChecks { redis, kafka },
        })
}

/// Readiness probe. Return 200 when dependencies are initialised and the server can handle traffic; return 503 otherwise.
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_ready())
}

/// Liveness probe. Return 200 while the process is marked alive and 503 once draining.
/// Call `HealthState::mark_unhealthy` before graceful shutdown to surface the drain early.
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_alive())
}
