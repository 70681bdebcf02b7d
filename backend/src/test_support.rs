//! Test utilities for the backplane crate.
//!
//! In-memory stand-ins for the cache cluster and the message bus, plus
//! controllable clocks. Shared by unit tests in `src/` and integration tests
//! in `tests/`; compiled only for tests or with the `test-support` feature.

mod cache;
mod clock;
mod events;

pub use cache::{BackendBehaviour, InMemoryCacheBackend};
pub use clock::{FixedClock, MutableClock};
pub use events::{RecordingTransport, TransportBehaviour};
