//! RONDO Orchestra - Step advancement and event-loop coordination
//!
//! The orchestra advances the shared 12-step counter, fires the scheduled
//! tasks bound to each step, drives independently-clocked event loops,
//! and hosts the protocol registry consumed by higher layers. It does not
//! own a clock of its own: the shell ticks it at the configured cadence.

pub mod event_loop;
pub mod orchestra;
pub mod protocol;
pub mod scheduler;

pub use event_loop::*;
pub use orchestra::*;
pub use protocol::*;
pub use scheduler::*;
