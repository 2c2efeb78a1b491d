//! RONDO Telemetry - Best-effort observation sampling
//!
//! The collector polls registered samplers on a fixed period and queues
//! the resulting observations in a bounded buffer. Telemetry is
//! best-effort by design: a full buffer drops the observation silently,
//! and draining never blocks the caller.

pub mod collector;

pub use collector::*;
