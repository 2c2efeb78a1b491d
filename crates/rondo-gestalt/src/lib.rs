//! RONDO Gestalt - The integrated composite view
//!
//! The gestalt folds per-core telemetry observations into one flat global
//! state map and a process graph, and produces immutable deep-copied
//! snapshots with a bounded history. Integration is last-write-wins per
//! core; the aggregated view is eventually consistent, not linearizable.

pub mod graph;
pub mod history;
pub mod state;

pub use graph::*;
pub use history::*;
pub use state::*;
