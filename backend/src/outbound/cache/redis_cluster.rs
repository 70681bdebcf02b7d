//! Pooled Redis Cluster backend.
//!
//! Connections come from a `bb8` pool whose manager hands out
//! `redis::cluster_async::ClusterConnection`s. Each cluster connection routes
//! commands by key slot and is safe to use from many tasks; the pool bounds
//! how many are open and keeps a few warm.
//!
//! The pool is built unchecked so construction never waits on the network.
//! Reachability is the adapter's concern (see
//! [`super::CacheAdapter::connect`]).

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bb8::{ManageConnection, Pool, RunError};
use redis::cluster::{ClusterClient, ClusterClientBuilder};
use redis::cluster_async::ClusterConnection;
use redis::{ErrorKind, RedisError};

use super::backend::{CacheBackend, CacheBackendError};
use crate::settings::CacheSettings;

/// Time allowed to open a TCP connection to a node.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(5);
/// Socket-level read/write bound for a single command.
pub const IO_TIMEOUT: Duration = Duration::from_secs(3);

/// Configuration for the cluster connection pool.
///
/// # Example
///
/// ```
/// use backplane::outbound::cache::RedisClusterConfig;
///
/// let config = RedisClusterConfig::new(["cache-1:6379", "cache-2:6379"])
///     .with_password("s3cret")
///     .with_max_size(20)
///     .with_min_idle(5);
/// assert_eq!(config.nodes().len(), 2);
/// ```
#[derive(Clone)]
pub struct RedisClusterConfig {
    nodes: Vec<String>,
    password: Option<String>,
    max_size: u32,
    min_idle: u32,
}

impl RedisClusterConfig {
    /// Create a configuration for the given `host:port` seed nodes.
    ///
    /// Defaults: 50 pooled connections, 10 kept idle, no auth.
    pub fn new<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            nodes: nodes.into_iter().map(Into::into).collect(),
            password: None,
            max_size: 50,
            min_idle: 10,
        }
    }

    /// Build from loaded settings.
    #[must_use]
    pub fn from_settings(settings: &CacheSettings) -> Self {
        let config = Self::new(settings.node_list())
            .with_max_size(settings.pool_size())
            .with_min_idle(settings.min_idle());
        match settings.password() {
            Some(secret) => config.with_password(secret),
            None => config,
        }
    }

    /// Authenticate with `secret`.
    #[must_use]
    pub fn with_password(mut self, secret: impl Into<String>) -> Self {
        self.password = Some(secret.into());
        self
    }

    /// Set the maximum number of pooled connections.
    #[must_use]
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size.max(1);
        self
    }

    /// Set the number of idle connections kept open.
    #[must_use]
    pub fn with_min_idle(mut self, min_idle: u32) -> Self {
        self.min_idle = min_idle;
        self
    }

    /// Seed nodes.
    #[must_use]
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    fn node_urls(&self) -> Vec<String> {
        self.nodes
            .iter()
            .map(|node| {
                if node.contains("://") {
                    node.clone()
                } else {
                    format!("redis://{node}")
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for RedisClusterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClusterConfig")
            .field("nodes", &self.nodes)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("max_size", &self.max_size)
            .field("min_idle", &self.min_idle)
            .finish()
    }
}

/// `bb8` manager producing cluster connections.
#[derive(Clone)]
pub struct RedisClusterConnectionManager {
    client: ClusterClient,
}

impl RedisClusterConnectionManager {
    /// Build a manager for the configured seed nodes.
    ///
    /// # Errors
    /// Returns the client error when a node address is malformed.
    pub fn new(config: &RedisClusterConfig) -> Result<Self, RedisError> {
        let mut builder = ClusterClientBuilder::new(config.node_urls())
            .connection_timeout(DIAL_TIMEOUT)
            .response_timeout(IO_TIMEOUT);
        if let Some(secret) = &config.password {
            builder = builder.password(secret.clone());
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl ManageConnection for RedisClusterConnectionManager {
    type Connection = ClusterConnection;
    type Error = RedisError;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        self.client.get_async_connection().await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        let pong: String = redis::cmd("PING").query_async(conn).await?;
        match pong.as_str() {
            "PONG" => Ok(()),
            _ => Err((ErrorKind::ResponseError, "ping request").into()),
        }
    }

    fn has_broken(&self, _: &mut Self::Connection) -> bool {
        false
    }
}

/// Production [`CacheBackend`] backed by a pooled Redis Cluster client.
pub struct RedisClusterBackend {
    pool: Mutex<Option<Pool<RedisClusterConnectionManager>>>,
}

impl RedisClusterBackend {
    /// Build the pool. No connection is attempted here.
    ///
    /// # Errors
    /// Returns [`CacheBackendError::Connection`] when the node list cannot be
    /// turned into a cluster client.
    pub fn new(config: &RedisClusterConfig) -> Result<Self, CacheBackendError> {
        let manager = RedisClusterConnectionManager::new(config)
            .map_err(|err| CacheBackendError::connection(err.to_string()))?;
        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(Some(config.min_idle))
            .connection_timeout(DIAL_TIMEOUT)
            .build_unchecked(manager);
        Ok(Self {
            pool: Mutex::new(Some(pool)),
        })
    }

    fn pool(&self) -> Result<Pool<RedisClusterConnectionManager>, CacheBackendError> {
        self.pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(CacheBackendError::closed)
    }

    async fn query<T>(&self, cmd: &redis::Cmd) -> Result<T, CacheBackendError>
    where
        T: redis::FromRedisValue,
    {
        let pool = self.pool()?;
        let mut conn = pool.get().await.map_err(map_run_error)?;
        cmd.query_async(&mut *conn)
            .await
            .map_err(|err| CacheBackendError::command(err.to_string()))
    }
}

fn map_run_error(err: RunError<RedisError>) -> CacheBackendError {
    match err {
        RunError::User(inner) => CacheBackendError::connection(inner.to_string()),
        RunError::TimedOut => {
            CacheBackendError::connection("timed out waiting for a pooled connection")
        }
    }
}

/// Build the `SET` command, choosing `EX` for whole seconds and `PX`
/// otherwise. A zero TTL sends no expiry.
pub(crate) fn set_command(key: &str, value: &str, ttl: Option<Duration>) -> redis::Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(value);
    match ttl.filter(|ttl| !ttl.is_zero()) {
        Some(ttl) if ttl.subsec_nanos() == 0 => {
            cmd.arg("EX").arg(ttl.as_secs());
        }
        Some(ttl) => {
            let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
            cmd.arg("PX").arg(millis);
        }
        None => {}
    }
    cmd
}

#[async_trait]
impl CacheBackend for RedisClusterBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheBackendError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.query(&cmd).await
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheBackendError> {
        self.query(&set_command(key, value, ttl)).await
    }

    async fn delete(&self, key: &str) -> Result<u64, CacheBackendError> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        self.query(&cmd).await
    }

    async fn ping(&self) -> Result<String, CacheBackendError> {
        self.query(&redis::cmd("PING")).await
    }

    async fn close(&self) {
        // Dropping the last pool handle closes idle connections; checked-out
        // ones close when their in-flight command returns.
        drop(self.pool.lock().unwrap_or_else(PoisonError::into_inner).take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::Value;
    use rstest::rstest;

    fn args(cmd: &redis::Cmd) -> Vec<String> {
        cmd.args_iter()
            .map(|arg| match arg {
                redis::Arg::Simple(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                redis::Arg::Cursor => "<cursor>".to_owned(),
            })
            .collect()
    }

    #[rstest]
    #[case(None, &["SET", "k", "v"])]
    #[case(Some(Duration::ZERO), &["SET", "k", "v"])]
    #[case(Some(Duration::from_secs(3600)), &["SET", "k", "v", "EX", "3600"])]
    #[case(Some(Duration::from_millis(1500)), &["SET", "k", "v", "PX", "1500"])]
    #[case(Some(Duration::from_micros(10)), &["SET", "k", "v", "PX", "1"])]
    fn set_command_passes_ttl_through(#[case] ttl: Option<Duration>, #[case] expected: &[&str]) {
        assert_eq!(args(&set_command("k", "v", ttl)), expected);
    }

    #[rstest]
    fn config_prefixes_scheme_once() {
        let config = RedisClusterConfig::new(["cache-1:6379", "rediss://cache-2:6380"]);
        assert_eq!(
            config.node_urls(),
            vec!["redis://cache-1:6379", "rediss://cache-2:6380"]
        );
    }

    #[rstest]
    fn config_debug_redacts_password() {
        let config = RedisClusterConfig::new(["cache-1:6379"]).with_password("hunter2");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[rstest]
    fn config_from_settings_uses_defaults() {
        let config = RedisClusterConfig::from_settings(&CacheSettings::default());
        assert_eq!(config.nodes().len(), 3);
        assert_eq!(config.max_size, 50);
        assert_eq!(config.min_idle, 10);
        assert!(config.password.is_none());
    }

    #[tokio::test]
    async fn closed_backend_rejects_commands() {
        let backend = RedisClusterBackend::new(&RedisClusterConfig::new(["127.0.0.1:1"]))
            .expect("pool builds without connecting");
        backend.close().await;
        backend.close().await;
        let err = backend.get("k").await.expect_err("closed");
        assert!(err.is_closed());
    }

    #[rstest]
    fn nil_reply_reads_as_absent() {
        let parsed: Option<String> =
            redis::FromRedisValue::from_redis_value(&Value::Nil).expect("nil parses");
        assert!(parsed.is_none());
    }
}
