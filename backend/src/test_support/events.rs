//! Recording bus transport with switchable failure modes.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::outbound::events::{
    DeliveryReceipt, EventTransport, OutboundRecord, TopicPartition, TransportError,
};

/// How the transport answers the next sends and probes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TransportBehaviour {
    /// Acknowledge every write on partition 0 with increasing offsets.
    #[default]
    Healthy,
    /// Reject every call with a delivery or connection error.
    Fail(String),
    /// Never answer.
    Stall,
}

#[derive(Default)]
struct State {
    records: Vec<OutboundRecord>,
    partitions: Vec<TopicPartition>,
    behaviour: TransportBehaviour,
}

/// [`EventTransport`] double that keeps every acknowledged record.
///
/// # Examples
/// ```
/// use backplane::test_support::RecordingTransport;
///
/// let transport = RecordingTransport::with_topics(&[("orders", 3), ("audit", 1)]);
/// assert!(transport.records().is_empty());
/// ```
#[derive(Default)]
pub struct RecordingTransport {
    state: Mutex<State>,
    next_offset: AtomicI64,
    closes: AtomicUsize,
}

impl RecordingTransport {
    /// Transport whose metadata lists `partitions` partitions per topic.
    #[must_use]
    pub fn with_topics(topics: &[(&str, i32)]) -> Self {
        let transport = Self::default();
        transport.state().partitions = topics
            .iter()
            .flat_map(|(topic, count)| {
                (0..*count).map(move |partition| TopicPartition {
                    topic: (*topic).to_owned(),
                    partition,
                })
            })
            .collect();
        transport
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switch how subsequent calls behave.
    pub fn set_behaviour(&self, behaviour: TransportBehaviour) {
        self.state().behaviour = behaviour;
    }

    /// Records acknowledged so far, in send order.
    #[must_use]
    pub fn records(&self) -> Vec<OutboundRecord> {
        self.state().records.clone()
    }

    /// Number of times `close` reached the transport.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    async fn gate(&self) -> Result<(), String> {
        let behaviour = self.state().behaviour.clone();
        match behaviour {
            TransportBehaviour::Healthy => Ok(()),
            TransportBehaviour::Fail(message) => Err(message),
            TransportBehaviour::Stall => std::future::pending().await,
        }
    }
}

#[async_trait]
impl EventTransport for RecordingTransport {
    async fn send(&self, record: OutboundRecord) -> Result<DeliveryReceipt, TransportError> {
        self.gate().await.map_err(TransportError::delivery)?;
        let offset = self.next_offset.fetch_add(1, Ordering::SeqCst);
        self.state().records.push(record);
        Ok(DeliveryReceipt {
            partition: 0,
            offset,
        })
    }

    async fn list_partitions(&self) -> Result<Vec<TopicPartition>, TransportError> {
        self.gate().await.map_err(TransportError::connection)?;
        Ok(self.state().partitions.clone())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
