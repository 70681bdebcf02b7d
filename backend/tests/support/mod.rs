//! Shared wiring for integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::sync::Arc;

use backplane::outbound::cache::CacheAdapter;
use backplane::outbound::events::EventBusPublisher;
use backplane::test_support::{InMemoryCacheBackend, RecordingTransport};

/// Cache adapter plus a handle on its in-memory backend.
pub fn cache_pair() -> (
    CacheAdapter<Arc<InMemoryCacheBackend>>,
    Arc<InMemoryCacheBackend>,
) {
    let backend = Arc::new(InMemoryCacheBackend::default());
    (CacheAdapter::new(Arc::clone(&backend)), backend)
}

/// Publisher plus a handle on its recording transport, reporting a single
/// `events` topic.
pub fn publisher_pair() -> (
    EventBusPublisher<Arc<RecordingTransport>>,
    Arc<RecordingTransport>,
) {
    let transport = Arc::new(RecordingTransport::with_topics(&[("events", 1)]));
    (
        EventBusPublisher::new(Arc::clone(&transport), backplane::SERVICE_NAME),
        transport,
    )
}
