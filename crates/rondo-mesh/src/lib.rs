//! RONDO Mesh - Worker-side primitives
//!
//! A core is a registered worker unit: it holds state and a processor,
//! exposes telemetry, and receives gestalt broadcasts. Channels and pipes
//! are the bounded, typed mailboxes between cores — point-to-point
//! messages and streamed data respectively, with fail-fast overflow and
//! explicit open/close lifecycles.

pub mod channel;
pub mod context;
pub mod core;
pub mod pipe;

pub use channel::*;
pub use context::*;
pub use pipe::*;
pub use self::core::*;
