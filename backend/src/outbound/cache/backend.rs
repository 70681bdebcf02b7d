//! Protocol seam between the cache adapter and a concrete client.
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::ports::define_port_error;

define_port_error! {
    /// Raw failures reported by a cache backend.
    pub enum CacheBackendError {
        /// No usable connection could be obtained.
        Connection { message: String } => "cache connection failed: {message}",
        /// The cluster answered with an error.
        Command { message: String } => "cache command failed: {message}",
        /// The backend has been closed.
        Closed => "cache backend is closed",
    }
}

/// Single-shot cache commands. Implementations perform exactly one attempt
/// and leave deadlines to the caller.
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    /// `GET key`; `Ok(None)` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheBackendError>;

    /// `SET key value`, with an expiry only when `ttl` is `Some`.
    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheBackendError>;

    /// `DEL key`, returning the number of removed entries.
    async fn delete(&self, key: &str) -> Result<u64, CacheBackendError>;

    /// `PING`, returning the server reply.
    async fn ping(&self) -> Result<String, CacheBackendError>;

    /// Release connections held by the backend.
    async fn close(&self);
}

#[async_trait]
impl<T: CacheBackend> CacheBackend for std::sync::Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheBackendError> {
        (**self).get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheBackendError> {
        (**self).set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<u64, CacheBackendError> {
        (**self).delete(key).await
    }

    async fn ping(&self) -> Result<String, CacheBackendError> {
        (**self).ping().await
    }

    async fn close(&self) {
        (**self).close().await;
    }
}
