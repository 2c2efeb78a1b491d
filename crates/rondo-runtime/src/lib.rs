//! RONDO Runtime - The telemetry shell
//!
//! The shell is the top-level owner that wires the substrate together.
//! Each tick of its loop:
//! 1. Advance the orchestra's 12-step counter (firing due tasks)
//! 2. Drain the telemetry collector
//! 3. Integrate the drained observations into the gestalt
//! 4. At synchronization steps (1-4), broadcast a gestalt snapshot to
//!    every registered core
//! 5. On wrap to step 0, increment the cycle counter
//!
//! All registries are fields of one shell instance; multiple shells can
//! coexist in the same process without shared global state.

pub mod config;
pub mod coords;
pub mod shell;

pub use config::*;
pub use coords::*;
pub use shell::*;
