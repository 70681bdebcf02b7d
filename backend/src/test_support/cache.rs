//! In-memory cache backend with switchable failure modes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::outbound::cache::{CacheBackend, CacheBackendError};

/// How the backend answers the next commands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackendBehaviour {
    /// Serve commands from the in-memory map.
    #[default]
    Healthy,
    /// Fail every command with a command error carrying this message.
    Fail(String),
    /// Never answer; callers must rely on their own deadline.
    Stall,
    /// Serve from the map after waiting this long.
    Delay(Duration),
}

#[derive(Default)]
struct State {
    entries: HashMap<String, String>,
    ttls: HashMap<String, Option<Duration>>,
    behaviour: BackendBehaviour,
}

/// [`CacheBackend`] double keeping entries in a map.
///
/// TTLs are recorded but never enforced.
///
/// # Examples
/// ```
/// use backplane::test_support::{BackendBehaviour, InMemoryCacheBackend};
///
/// let backend = InMemoryCacheBackend::default();
/// backend.insert("greeting", "\"hello\"");
/// backend.set_behaviour(BackendBehaviour::Stall);
/// assert_eq!(backend.entry("greeting").as_deref(), Some("\"hello\""));
/// ```
#[derive(Default)]
pub struct InMemoryCacheBackend {
    state: Mutex<State>,
    closes: AtomicUsize,
}

impl InMemoryCacheBackend {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switch how subsequent commands behave.
    pub fn set_behaviour(&self, behaviour: BackendBehaviour) {
        self.state().behaviour = behaviour;
    }

    /// Seed an entry directly, bypassing behaviour.
    pub fn insert(&self, key: &str, value: &str) {
        self.state().entries.insert(key.to_owned(), value.to_owned());
    }

    /// Stored value for `key`, bypassing behaviour.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<String> {
        self.state().entries.get(key).cloned()
    }

    /// TTL passed with the last successful `SET` of `key`.
    #[must_use]
    pub fn ttl(&self, key: &str) -> Option<Option<Duration>> {
        self.state().ttls.get(key).copied()
    }

    /// Number of times `close` reached the backend.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    async fn gate(&self) -> Result<(), CacheBackendError> {
        let behaviour = self.state().behaviour.clone();
        match behaviour {
            BackendBehaviour::Healthy => Ok(()),
            BackendBehaviour::Fail(message) => Err(CacheBackendError::command(message)),
            BackendBehaviour::Stall => std::future::pending().await,
            BackendBehaviour::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheBackendError> {
        self.gate().await?;
        Ok(self.entry(key))
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheBackendError> {
        self.gate().await?;
        let mut state = self.state();
        state.entries.insert(key.to_owned(), value.to_owned());
        state.ttls.insert(key.to_owned(), ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<u64, CacheBackendError> {
        self.gate().await?;
        let mut state = self.state();
        state.ttls.remove(key);
        Ok(u64::from(state.entries.remove(key).is_some()))
    }

    async fn ping(&self) -> Result<String, CacheBackendError> {
        self.gate().await?;
        Ok("PONG".to_owned())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
