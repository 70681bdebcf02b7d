//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    CacheService, EventPublisher, FixtureCacheService, FixtureEventPublisher,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Cache adapter shared by every request.
    pub cache: Arc<dyn CacheService>,
    /// Event publisher shared by every request.
    pub events: Arc<dyn EventPublisher>,
    /// Service name reported by `/health` and `/api/info`.
    pub service: String,
}

impl HttpState {
    /// Bundle the two backend ports.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use backplane::domain::ports::{FixtureCacheService, FixtureEventPublisher};
    /// use backplane::inbound::http::state::HttpState;
    ///
    /// let state = HttpState::new(
    ///     Arc::new(FixtureCacheService),
    ///     Arc::new(FixtureEventPublisher),
    ///     "backplane",
    /// );
    /// assert_eq!(state.service, "backplane");
    /// ```
    pub fn new(
        cache: Arc<dyn CacheService>,
        events: Arc<dyn EventPublisher>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            events,
            service: service.into(),
        }
    }

    /// State backed by the no-op fixtures.
    #[must_use]
    pub fn fixtures() -> Self {
        Self::new(
            Arc::new(FixtureCacheService),
            Arc::new(FixtureEventPublisher),
            crate::SERVICE_NAME,
        )
    }
}
