//! Port for emitting enveloped events onto the bus.
use async_trait::async_trait;
use serde_json::Value;

use super::define_port_error;
use crate::domain::{HealthReport, MessageId};

define_port_error! {
    /// Errors surfaced by the publisher. Every variant means the event was
    /// not acknowledged; the caller owns any retry.
    pub enum PublishError {
        /// The envelope could not be serialized; nothing was sent.
        Serialization { message: String } => "event serialization failed: {message}",
        /// The broker did not acknowledge within the send deadline.
        Timeout { message: String } => "event publish timed out: {message}",
        /// The broker rejected the write or could not be reached.
        Transport { message: String } => "event transport failure: {message}",
        /// The publisher was closed before the call started.
        Closed => "event publisher is closed",
    }
}

/// Publishing operations consumed by the façade.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish `payload` to `topic`, returning the identifier minted for it.
    ///
    /// An empty `key` means "no partition key"; the message identifier is
    /// used in its place.
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &Value,
    ) -> Result<MessageId, PublishError>;

    /// Probe cluster topology.
    async fn health_check(&self) -> HealthReport;

    /// Flush pending batches and release the writer. Safe to call more than
    /// once.
    async fn close(&self);
}

/// Fixture implementation for tests that do not exercise the bus.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureEventPublisher;

#[async_trait]
impl EventPublisher for FixtureEventPublisher {
    async fn publish(
        &self,
        _topic: &str,
        _key: &str,
        _payload: &Value,
    ) -> Result<MessageId, PublishError> {
        Ok(MessageId::generate())
    }

    async fn health_check(&self) -> HealthReport {
        HealthReport::up_with_topics(0)
    }

    async fn close(&self) {}
}
