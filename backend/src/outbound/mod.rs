//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **cache**: Redis Cluster access behind [`crate::domain::ports::CacheService`]
//! - **events**: Kafka publishing behind [`crate::domain::ports::EventPublisher`]
//!
//! Each adapter wraps a narrow backend seam ([`cache::CacheBackend`],
//! [`events::EventTransport`]) and owns the timeout and outcome-normalization
//! rules; the seams only speak the backend protocol.

pub mod cache;
pub mod events;
