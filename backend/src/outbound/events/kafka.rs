//! Kafka transport built on librdkafka.
//!
//! Writes go through one shared `FutureProducer`, which batches internally
//! and is safe for concurrent use. Health probes bypass it and open a
//! short-lived metadata client against the first broker only.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tracing::{error, info};

use super::transport::{
    DeliveryReceipt, EventTransport, OutboundRecord, TopicPartition, TransportError,
};
use crate::settings::EventBusSettings;

/// How long librdkafka may hold a message before reporting it undelivered.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);
/// Bound on the metadata probe used for health checks.
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(5);
/// Bound on flushing pending batches at shutdown.
pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Producer configuration.
///
/// ```
/// use std::time::Duration;
/// use backplane::outbound::events::KafkaConfig;
///
/// let config = KafkaConfig::new(["kafka-1:9092"], "backplane")
///     .with_batch_size(50)
///     .with_linger(Duration::from_millis(5));
/// assert_eq!(config.brokers(), ["kafka-1:9092"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaConfig {
    brokers: Vec<String>,
    client_id: String,
    batch_size: u32,
    linger: Duration,
}

impl KafkaConfig {
    /// Configuration for `brokers`, identifying as `client_id`.
    ///
    /// Defaults: batches of 100 messages lingering at most 10ms.
    pub fn new<I, S>(brokers: I, client_id: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            brokers: brokers.into_iter().map(Into::into).collect(),
            client_id: client_id.into(),
            batch_size: 100,
            linger: Duration::from_millis(10),
        }
    }

    /// Build from loaded settings.
    pub fn from_settings(settings: &EventBusSettings, client_id: impl Into<String>) -> Self {
        Self::new(settings.broker_list(), client_id)
            .with_batch_size(settings.batch_size())
            .with_linger(Duration::from_millis(settings.linger_ms()))
    }

    /// Cap on messages per batch.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Maximum time a batch waits before being sent.
    #[must_use]
    pub fn with_linger(mut self, linger: Duration) -> Self {
        self.linger = linger;
        self
    }

    /// Configured brokers.
    #[must_use]
    pub fn brokers(&self) -> &[String] {
        &self.brokers
    }

    /// librdkafka settings for the batching writer.
    ///
    /// `acks=all` makes every in-sync replica confirm a write. librdkafka has
    /// no least-bytes partitioner; since every record carries a key,
    /// `murmur2_random` gives key-stable placement.
    pub(crate) fn producer_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", self.brokers.join(","))
            .set("client.id", &self.client_id)
            .set("acks", "all")
            .set("partitioner", "murmur2_random")
            .set("batch.num.messages", self.batch_size.to_string())
            .set("linger.ms", self.linger.as_millis().to_string())
            .set("message.timeout.ms", DELIVERY_TIMEOUT.as_millis().to_string());
        config
    }

    /// librdkafka settings for the single-broker metadata probe.
    pub(crate) fn probe_config(&self) -> Option<ClientConfig> {
        let broker = self.brokers.first()?;
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", broker)
            .set("client.id", format!("{}-health", self.client_id))
            .set(
                "socket.connection.setup.timeout.ms",
                METADATA_TIMEOUT.as_millis().to_string(),
            );
        Some(config)
    }
}

/// Production [`EventTransport`] writing to Kafka.
pub struct KafkaTransport {
    producer: Mutex<Option<FutureProducer>>,
    config: KafkaConfig,
}

impl KafkaTransport {
    /// Create the batching writer. No broker is contacted here.
    ///
    /// # Errors
    /// Returns [`TransportError::Connection`] when librdkafka rejects the
    /// configuration.
    pub fn new(config: KafkaConfig) -> Result<Self, TransportError> {
        let producer: FutureProducer = config
            .producer_config()
            .create()
            .map_err(|err| TransportError::connection(err.to_string()))?;
        info!(brokers = ?config.brokers, "kafka writer initialized");
        Ok(Self {
            producer: Mutex::new(Some(producer)),
            config,
        })
    }

    fn producer(&self) -> Result<FutureProducer, TransportError> {
        self.producer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(TransportError::closed)
    }
}

fn owned_headers(headers: &[(String, String)]) -> OwnedHeaders {
    headers
        .iter()
        .fold(OwnedHeaders::new(), |acc, (key, value)| {
            acc.insert(Header {
                key: key.as_str(),
                value: Some(value.as_str()),
            })
        })
}

fn probe_partitions(config: ClientConfig) -> Result<Vec<TopicPartition>, TransportError> {
    let client: BaseConsumer = config
        .create()
        .map_err(|err| TransportError::connection(err.to_string()))?;
    let metadata = client
        .fetch_metadata(None, Timeout::After(METADATA_TIMEOUT))
        .map_err(|err| TransportError::connection(err.to_string()))?;
    Ok(metadata
        .topics()
        .iter()
        .flat_map(|topic| {
            topic.partitions().iter().map(|partition| TopicPartition {
                topic: topic.name().to_owned(),
                partition: partition.id(),
            })
        })
        .collect())
}

#[async_trait]
impl EventTransport for KafkaTransport {
    async fn send(&self, record: OutboundRecord) -> Result<DeliveryReceipt, TransportError> {
        let producer = self.producer()?;
        let future_record = FutureRecord::to(&record.topic)
            .key(record.key.as_str())
            .payload(record.payload.as_slice())
            .headers(owned_headers(&record.headers));
        match producer
            .send(future_record, Timeout::After(DELIVERY_TIMEOUT))
            .await
        {
            Ok((partition, offset)) => Ok(DeliveryReceipt { partition, offset }),
            Err((err, _)) => Err(TransportError::delivery(err.to_string())),
        }
    }

    async fn list_partitions(&self) -> Result<Vec<TopicPartition>, TransportError> {
        let config = self
            .config
            .probe_config()
            .ok_or_else(|| TransportError::connection("no brokers configured"))?;
        tokio::task::spawn_blocking(move || probe_partitions(config))
            .await
            .map_err(|err| TransportError::connection(format!("metadata probe aborted: {err}")))?
    }

    async fn close(&self) {
        let Some(producer) = self
            .producer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };
        let flushed =
            tokio::task::spawn_blocking(move || producer.flush(Timeout::After(FLUSH_TIMEOUT))).await;
        match flushed {
            Ok(Ok(())) => info!("kafka writer flushed"),
            Ok(Err(err)) => error!(error = %err, "kafka writer flush failed"),
            Err(err) => error!(error = %err, "kafka writer flush aborted"),
        }
    }
}

/// Count distinct topics in a partition listing.
#[must_use]
pub fn distinct_topics(partitions: &[TopicPartition]) -> usize {
    partitions
        .iter()
        .map(|partition| partition.topic.as_str())
        .collect::<HashSet<_>>()
        .len()
}
