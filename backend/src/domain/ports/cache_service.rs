//! Port for best-effort access to the key-value cache cluster.
use std::time::Duration;

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::HealthReport;

define_port_error! {
    /// Errors surfaced by cache writes.
    ///
    /// Reads and deletes never return these; they collapse failures into a
    /// miss instead.
    pub enum CacheError {
        /// The call did not complete within its deadline.
        Timeout { message: String } => "cache call timed out: {message}",
        /// The cluster rejected the call or could not be reached.
        Backend { message: String } => "cache backend failure: {message}",
        /// The adapter was closed before the call started.
        Closed => "cache adapter is closed",
    }
}

/// Cache operations consumed by the façade.
///
/// Values are opaque strings that were already serialized by the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Read `key`. `None` covers both a true miss and any backend failure.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`. `None` or a zero `ttl` means no expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Remove `key`, returning whether an entry was removed. Failures read
    /// as `false`.
    async fn delete(&self, key: &str) -> bool;

    /// Probe cluster liveness.
    async fn health_check(&self) -> HealthReport;

    /// Release pooled connections. Safe to call more than once.
    async fn close(&self);
}

/// Fixture implementation for tests that do not exercise the cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCacheService;

#[async_trait]
impl CacheService for FixtureCacheService {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> bool {
        false
    }

    async fn health_check(&self) -> HealthReport {
        HealthReport::up_with_response("PONG")
    }

    async fn close(&self) {}
}
