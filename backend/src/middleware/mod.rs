//! Request middleware.
//!
//! Request-lifecycle concerns that wrap every façade route.

pub mod trace;

pub use trace::Trace;
