//! Driven ports for the two external backends.

mod macros;
pub(crate) use macros::define_port_error;

mod cache_service;
mod event_publisher;

#[cfg(test)]
pub use cache_service::MockCacheService;
pub use cache_service::{CacheError, CacheService, FixtureCacheService};
#[cfg(test)]
pub use event_publisher::MockEventPublisher;
pub use event_publisher::{EventPublisher, FixtureEventPublisher, PublishError};
