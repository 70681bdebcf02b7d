//! Protocol seam between the publisher and a concrete bus client.
use async_trait::async_trait;

use crate::domain::ports::define_port_error;

/// Header naming the body encoding.
pub const CONTENT_TYPE_HEADER: &str = "content-type";
/// Header repeating the envelope identifier.
pub const MESSAGE_ID_HEADER: &str = "message-id";
/// Header repeating the envelope source.
pub const SOURCE_HEADER: &str = "source";
/// Body encoding of every envelope.
pub const JSON_CONTENT_TYPE: &str = "application/json";

define_port_error! {
    /// Raw failures reported by a bus transport.
    pub enum TransportError {
        /// The cluster could not be reached.
        Connection { message: String } => "bus connection failed: {message}",
        /// The cluster refused or failed to acknowledge a write.
        Delivery { message: String } => "bus delivery failed: {message}",
        /// The transport has been closed.
        Closed => "bus transport is closed",
    }
}

/// A fully encoded message ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRecord {
    /// Destination topic.
    pub topic: String,
    /// Partition key.
    pub key: String,
    /// Serialized envelope.
    pub payload: Vec<u8>,
    /// Transport headers sent beside the body, in order.
    pub headers: Vec<(String, String)>,
}

impl OutboundRecord {
    /// Look up a header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Where the broker stored an acknowledged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Partition the message landed on.
    pub partition: i32,
    /// Offset within that partition.
    pub offset: i64,
}

/// One partition of one topic as reported by cluster metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPartition {
    /// Topic name.
    pub topic: String,
    /// Partition id.
    pub partition: i32,
}

/// Single-shot bus operations; deadlines are the caller's concern.
#[async_trait]
pub trait EventTransport: Send + Sync + 'static {
    /// Write one record and wait for the configured acknowledgement level.
    async fn send(&self, record: OutboundRecord) -> Result<DeliveryReceipt, TransportError>;

    /// List known topic partitions by dialing a single broker directly,
    /// outside the batching writer.
    async fn list_partitions(&self) -> Result<Vec<TopicPartition>, TransportError>;

    /// Flush pending batches and release the writer.
    async fn close(&self);
}

#[async_trait]
impl<T: EventTransport> EventTransport for std::sync::Arc<T> {
    async fn send(&self, record: OutboundRecord) -> Result<DeliveryReceipt, TransportError> {
        (**self).send(record).await
    }

    async fn list_partitions(&self) -> Result<Vec<TopicPartition>, TransportError> {
        (**self).list_partitions().await
    }

    async fn close(&self) {
        (**self).close().await;
    }
}
