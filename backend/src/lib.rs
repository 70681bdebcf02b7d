//! Resilient access to a key-value cache cluster and a message bus.
//!
//! The library exposes two driven ports ([`domain::ports::CacheService`] and
//! [`domain::ports::EventPublisher`]), their production adapters under
//! [`outbound`], and the thin HTTP façade under [`inbound::http`].

pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use middleware::Trace;

/// Identifier stamped on envelopes and reported by the façade.
pub const SERVICE_NAME: &str = "backplane";
