//! Service configuration loaded via OrthoConfig.
//!
//! Each section reads its own environment prefix (`REDIS_*`, `KAFKA_*`,
//! `APP_*`). Unset values fall back to the defaults of the reference
//! deployment: a three-node cache cluster and a three-broker bus.

use std::ffi::OsString;

use mockable::Env;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Cache nodes used when `REDIS_NODES` is unset or blank.
pub const DEFAULT_CACHE_NODES: &str = "redis-1:6379,redis-2:6379,redis-3:6379";
/// Brokers used when `KAFKA_BROKERS` is unset or blank.
pub const DEFAULT_BROKERS: &str = "kafka-1:9092,kafka-2:9092,kafka-3:9092";
/// Port the façade listens on when neither `APP_PORT` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 8000;

const DEFAULT_POOL_SIZE: u32 = 50;
const DEFAULT_MIN_IDLE: u32 = 10;
const DEFAULT_BATCH_SIZE: u32 = 100;
const DEFAULT_LINGER_MS: u64 = 10;
const DEFAULT_HOST: &str = "0.0.0.0";

/// Split a comma-separated address list, dropping blank entries. An empty
/// result falls back to `default`.
///
/// # Examples
/// ```
/// use backplane::settings::split_addresses;
///
/// assert_eq!(split_addresses(Some(" a:1, ,b:2 "), "x:0"), vec!["a:1", "b:2"]);
/// assert_eq!(split_addresses(Some(""), "x:0"), vec!["x:0"]);
/// ```
#[must_use]
pub fn split_addresses(raw: Option<&str>, default: &str) -> Vec<String> {
    let parse = |value: &str| -> Vec<String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_owned)
            .collect()
    };
    let parsed = raw.map(parse).unwrap_or_default();
    if parsed.is_empty() {
        parse(default)
    } else {
        parsed
    }
}

/// Accept a textual setting however the environment layer typed it.
///
/// A comma list arrives as a sequence and a numeric secret as a number;
/// both are folded back into the raw string.
fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    fn scalar(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(text) => Some(text),
            Value::Array(items) => Some(
                items
                    .into_iter()
                    .filter_map(scalar)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            other => Some(other.to_string()),
        }
    }
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(scalar))
}

fn load_section<T: OrthoConfig>() -> std::io::Result<T> {
    T::load_from_iter([OsString::from("backplane")])
        .map_err(|err| std::io::Error::other(format!("configuration error: {err}")))
}

/// Connection settings for the cache cluster.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "REDIS")]
pub struct CacheSettings {
    /// Comma-separated `host:port` seed nodes.
    #[serde(default, deserialize_with = "deserialize_text")]
    pub nodes: Option<String>,
    /// Cluster auth secret; empty disables auth.
    #[serde(default, deserialize_with = "deserialize_text")]
    pub password: Option<String>,
    /// Upper bound on pooled connections.
    #[ortho_config(default = DEFAULT_POOL_SIZE)]
    pub pool_size: Option<u32>,
    /// Idle connections kept warm.
    #[ortho_config(default = DEFAULT_MIN_IDLE)]
    pub min_idle: Option<u32>,
}

impl CacheSettings {
    /// Load from the environment.
    ///
    /// # Errors
    /// Returns an I/O error describing malformed values.
    pub fn from_env() -> std::io::Result<Self> {
        load_section()
    }

    /// Seed nodes, falling back to [`DEFAULT_CACHE_NODES`].
    #[must_use]
    pub fn node_list(&self) -> Vec<String> {
        split_addresses(self.nodes.as_deref(), DEFAULT_CACHE_NODES)
    }

    /// Auth secret, `None` when unset or empty.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|secret| !secret.is_empty())
    }

    /// Maximum pool size.
    #[must_use]
    pub fn pool_size(&self) -> u32 {
        self.pool_size.filter(|size| *size > 0).unwrap_or(DEFAULT_POOL_SIZE)
    }

    /// Minimum idle connections, never above the pool size.
    #[must_use]
    pub fn min_idle(&self) -> u32 {
        self.min_idle.unwrap_or(DEFAULT_MIN_IDLE).min(self.pool_size())
    }
}

/// Connection settings for the event bus.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "KAFKA")]
pub struct EventBusSettings {
    /// Comma-separated `host:port` brokers.
    #[serde(default, deserialize_with = "deserialize_text")]
    pub brokers: Option<String>,
    /// Maximum messages per batch.
    #[ortho_config(default = DEFAULT_BATCH_SIZE)]
    pub batch_size: Option<u32>,
    /// How long a batch may wait before it is flushed.
    #[ortho_config(default = DEFAULT_LINGER_MS)]
    pub linger_ms: Option<u64>,
}

impl EventBusSettings {
    /// Load from the environment.
    ///
    /// # Errors
    /// Returns an I/O error describing malformed values.
    pub fn from_env() -> std::io::Result<Self> {
        load_section()
    }

    /// Brokers, falling back to [`DEFAULT_BROKERS`].
    #[must_use]
    pub fn broker_list(&self) -> Vec<String> {
        split_addresses(self.brokers.as_deref(), DEFAULT_BROKERS)
    }

    /// Batch size ceiling.
    #[must_use]
    pub fn batch_size(&self) -> u32 {
        self.batch_size.filter(|size| *size > 0).unwrap_or(DEFAULT_BATCH_SIZE)
    }

    /// Batch linger in milliseconds.
    #[must_use]
    pub fn linger_ms(&self) -> u64 {
        self.linger_ms.unwrap_or(DEFAULT_LINGER_MS)
    }
}

/// Listener settings for the HTTP façade.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "APP")]
pub struct ServerSettings {
    /// Interface to bind.
    #[ortho_config(default = DEFAULT_HOST.to_owned())]
    #[serde(default, deserialize_with = "deserialize_text")]
    pub host: Option<String>,
    /// Port to bind; see [`ServerSettings::port`].
    pub port: Option<u16>,
}

impl ServerSettings {
    /// Load from the environment.
    ///
    /// # Errors
    /// Returns an I/O error describing malformed values.
    pub fn from_env() -> std::io::Result<Self> {
        load_section()
    }

    /// Interface to bind.
    #[must_use]
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    /// `APP_PORT`, then the bare `PORT` variable, then [`DEFAULT_PORT`].
    pub fn port(&self, env: &impl Env) -> u16 {
        self.port
            .or_else(|| env.string("PORT").and_then(|raw| raw.trim().parse().ok()))
            .unwrap_or(DEFAULT_PORT)
    }
}
