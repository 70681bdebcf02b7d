//! Event publisher: enveloped, acknowledged writes to the message bus.
//!
//! Each publish mints a fresh [`MessageId`], wraps the payload in an
//! [`EventEnvelope`] stamped with this service's name and the current UTC
//! second, and waits for every in-sync replica to acknowledge. The message
//! id doubles as the partition key when the caller supplies none.

mod kafka;
mod transport;

pub use kafka::{
    DELIVERY_TIMEOUT, FLUSH_TIMEOUT, KafkaConfig, KafkaTransport, METADATA_TIMEOUT,
    distinct_topics,
};
pub use transport::{
    CONTENT_TYPE_HEADER, DeliveryReceipt, EventTransport, JSON_CONTENT_TYPE, MESSAGE_ID_HEADER,
    OutboundRecord, SOURCE_HEADER, TopicPartition, TransportError,
};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::domain::ports::{EventPublisher, PublishError};
use crate::domain::{EventEnvelope, HealthReport, MessageId};

/// Deadline for one publish, acknowledgement included.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);
/// Deadline for the topology probe behind health checks.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// [`EventPublisher`] implementation over any [`EventTransport`].
pub struct EventBusPublisher<T = KafkaTransport> {
    transport: T,
    clock: Arc<dyn Clock + Send + Sync>,
    source: String,
    send_timeout: Duration,
    health_timeout: Duration,
    closed: AtomicBool,
}

impl<T: EventTransport> EventBusPublisher<T> {
    /// Publisher stamping envelopes with `source` and wall-clock time.
    pub fn new(transport: T, source: impl Into<String>) -> Self {
        Self {
            transport,
            clock: Arc::new(DefaultClock),
            source: source.into(),
            send_timeout: SEND_TIMEOUT,
            health_timeout: HEALTH_TIMEOUT,
            closed: AtomicBool::new(false),
        }
    }

    /// Replace the clock used for envelope timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the publish deadline.
    #[must_use]
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Override the health probe deadline.
    #[must_use]
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Envelope source identifier.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Publish any serializable payload.
    ///
    /// # Errors
    /// - [`PublishError::Serialization`] when the envelope cannot be encoded;
    ///   nothing reaches the transport.
    /// - [`PublishError::Timeout`] when no acknowledgement arrives in time.
    /// - [`PublishError::Transport`] when the bus rejects the write.
    /// - [`PublishError::Closed`] after [`EventPublisher::close`].
    pub async fn publish_serializable<P>(
        &self,
        topic: &str,
        key: &str,
        payload: &P,
    ) -> Result<MessageId, PublishError>
    where
        P: Serialize + Sync + ?Sized,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(PublishError::closed());
        }

        let id = MessageId::generate();
        let envelope = EventEnvelope::new(id, self.source.as_str(), self.clock.utc(), payload);
        let body = envelope.to_json_bytes().map_err(|err| {
            error!(message_id = %id, topic = %topic, error = %err, "event serialization failed");
            PublishError::serialization(err.to_string())
        })?;

        let id_text = id.to_string();
        let key = if key.is_empty() { id_text.clone() } else { key.to_owned() };
        let record = OutboundRecord {
            topic: topic.to_owned(),
            key,
            payload: body,
            headers: vec![
                (CONTENT_TYPE_HEADER.to_owned(), JSON_CONTENT_TYPE.to_owned()),
                (MESSAGE_ID_HEADER.to_owned(), id_text),
                (SOURCE_HEADER.to_owned(), self.source.clone()),
            ],
        };

        match tokio::time::timeout(self.send_timeout, self.transport.send(record)).await {
            Ok(Ok(receipt)) => {
                info!(
                    message_id = %id,
                    topic = %topic,
                    partition = receipt.partition,
                    offset = receipt.offset,
                    "event delivered"
                );
                Ok(id)
            }
            Ok(Err(err)) => {
                error!(message_id = %id, topic = %topic, error = %err, "event publish failed");
                if err.is_closed() {
                    Err(PublishError::closed())
                } else {
                    Err(PublishError::transport(err.to_string()))
                }
            }
            Err(_) => {
                error!(
                    message_id = %id,
                    topic = %topic,
                    timeout = ?self.send_timeout,
                    "event publish timed out"
                );
                Err(PublishError::timeout(format!(
                    "no acknowledgement for {id} within {:?}",
                    self.send_timeout
                )))
            }
        }
    }
}

impl EventBusPublisher<KafkaTransport> {
    /// Create the batching Kafka writer for `config`.
    ///
    /// # Errors
    /// Returns [`TransportError::Connection`] when the producer cannot be
    /// configured. Broker reachability is not checked.
    pub fn connect(config: KafkaConfig, source: impl Into<String>) -> Result<Self, TransportError> {
        Ok(Self::new(KafkaTransport::new(config)?, source))
    }
}

#[async_trait]
impl<T: EventTransport> EventPublisher for EventBusPublisher<T> {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &Value,
    ) -> Result<MessageId, PublishError> {
        self.publish_serializable(topic, key, payload).await
    }

    async fn health_check(&self) -> HealthReport {
        match tokio::time::timeout(self.health_timeout, self.transport.list_partitions()).await {
            Ok(Ok(partitions)) => HealthReport::up_with_topics(distinct_topics(&partitions)),
            Ok(Err(err)) => {
                warn!(error = %err, "event bus health probe failed");
                HealthReport::down(err.to_string())
            }
            Err(_) => {
                warn!(timeout = ?self.health_timeout, "event bus health probe timed out");
                HealthReport::down(format!(
                    "metadata probe exceeded {:?}",
                    self.health_timeout
                ))
            }
        }
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.transport.close().await;
        info!("event publisher closed");
    }
}
