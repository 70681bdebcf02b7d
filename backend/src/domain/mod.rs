//! Domain types shared by the HTTP façade and the backend adapters.
//!
//! Nothing here performs I/O. Inbound adapters translate [`Error`] into
//! transport responses; outbound adapters implement the [`ports`].

pub mod envelope;
pub mod error;
pub mod health;
pub mod ports;
pub mod trace_id;

pub use self::envelope::{EventEnvelope, MessageId};
pub use self::error::{Error, ErrorCode};
pub use self::health::{HealthDetail, HealthReport, HealthStatus};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
