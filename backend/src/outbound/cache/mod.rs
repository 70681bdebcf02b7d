//! Cache adapter: bounded-latency access to the key-value cluster.
//!
//! Every call is a single attempt wrapped in a fixed deadline. Outcomes are
//! normalized per the [`CacheService`] contract:
//!
//! | Operation | Success | Miss | Timeout / backend error |
//! |-----------|---------|------|-------------------------|
//! | `get`     | `Some(value)` | `None` | logged, `None` |
//! | `set`     | `Ok(())` | n/a | logged, `Err(CacheError)` |
//! | `delete`  | `removed > 0` | `false` | logged, `false` |
//!
//! Reads and deletes deliberately cannot tell a miss from a failure; writes
//! propagate because callers must know whether the value landed.

mod backend;
mod redis_cluster;

pub use backend::{CacheBackend, CacheBackendError};
pub use redis_cluster::{
    DIAL_TIMEOUT, IO_TIMEOUT, RedisClusterBackend, RedisClusterConfig,
    RedisClusterConnectionManager,
};

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::domain::HealthReport;
use crate::domain::ports::{CacheError, CacheService};

/// Deadline applied to every get/set/delete/health call.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(2);
/// Deadline for the reachability probe issued by [`CacheAdapter::connect`].
pub const STARTUP_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// [`CacheService`] implementation over any [`CacheBackend`].
///
/// Holds no entries and no mutable state beyond the closed flag, so one
/// instance is shared by all request handlers.
pub struct CacheAdapter<B = RedisClusterBackend> {
    backend: B,
    call_timeout: Duration,
    closed: AtomicBool,
}

impl<B: CacheBackend> CacheAdapter<B> {
    /// Wrap `backend` without probing it.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            call_timeout: CALL_TIMEOUT,
            closed: AtomicBool::new(false),
        }
    }

    /// Override the per-call deadline.
    #[must_use]
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Wrap `backend` and probe it once.
    ///
    /// An unreachable cluster is logged as a warning and the adapter is
    /// returned anyway; later calls report their own failures.
    pub async fn connect(backend: B) -> Self {
        let adapter = Self::new(backend);
        match tokio::time::timeout(STARTUP_PROBE_TIMEOUT, adapter.backend.ping()).await {
            Ok(Ok(_)) => info!("connected to cache cluster"),
            Ok(Err(err)) => warn!(error = %err, "failed to connect to cache cluster"),
            Err(_) => warn!(
                timeout = ?STARTUP_PROBE_TIMEOUT,
                "failed to connect to cache cluster: probe timed out"
            ),
        }
        adapter
    }

    /// Run one backend call under the deadline, refusing to start once
    /// closed.
    async fn bounded<T, F>(&self, op: &'static str, key: &str, call: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheBackendError>>,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(CacheError::closed());
        }
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) if err.is_closed() => Err(CacheError::closed()),
            Ok(Err(err)) => Err(CacheError::backend(err.to_string())),
            Err(_) => Err(CacheError::timeout(format!(
                "{op} {key} exceeded {:?}",
                self.call_timeout
            ))),
        }
    }
}

impl CacheAdapter<RedisClusterBackend> {
    /// Build the pooled cluster client and probe it.
    ///
    /// # Errors
    /// Fails only when the node list is malformed; an unreachable cluster
    /// is not an error.
    pub async fn connect_cluster(config: &RedisClusterConfig) -> Result<Self, CacheBackendError> {
        let backend = RedisClusterBackend::new(config)?;
        Ok(Self::connect(backend).await)
    }
}

#[async_trait]
impl<B: CacheBackend> CacheService for CacheAdapter<B> {
    async fn get(&self, key: &str) -> Option<String> {
        match self.bounded("GET", key, self.backend.get(key)).await {
            Ok(Some(value)) => {
                debug!(key = %key, found = true, "cache GET");
                Some(value)
            }
            Ok(None) => {
                debug!(key = %key, found = false, "cache GET");
                None
            }
            Err(err) => {
                error!(key = %key, error = %err, "cache GET failed");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let ttl = ttl.filter(|ttl| !ttl.is_zero());
        self.bounded("SET", key, self.backend.set(key, value, ttl))
            .await
            .inspect(|()| debug!(key = %key, ttl = ?ttl, "cache SET"))
            .inspect_err(|err| error!(key = %key, error = %err, "cache SET failed"))
    }

    async fn delete(&self, key: &str) -> bool {
        match self.bounded("DELETE", key, self.backend.delete(key)).await {
            Ok(removed) => {
                let deleted = removed > 0;
                debug!(key = %key, deleted, "cache DELETE");
                deleted
            }
            Err(err) => {
                error!(key = %key, error = %err, "cache DELETE failed");
                false
            }
        }
    }

    async fn health_check(&self) -> HealthReport {
        let started = Instant::now();
        match self.bounded("PING", "", self.backend.ping()).await {
            Ok(reply) => HealthReport::up_with_response(reply).with_latency(started.elapsed()),
            Err(err) => HealthReport::down(err.to_string()),
        }
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.backend.close().await;
        info!("cache adapter closed");
    }
}

#[cfg(test)]
mod tests;
