//! Execution context derived for each registered core

use std::sync::Arc;

use rondo_core::CoreId;
use rondo_gestalt::GestaltSnapshot;

/// The context a core inherits from the shell at registration: its frame,
/// its projected coordinates, and — once the first synchronization point
/// passes — the latest gestalt snapshot.
///
/// The gestalt field is a shared read-only snapshot; a core never holds a
/// reference back into the shell's live state.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    pub core_id: CoreId,
    pub frame: String,
    pub coordinates: Vec<f64>,
    pub gestalt: Option<Arc<GestaltSnapshot>>,
}

impl ExecutionContext {
    pub fn new(core_id: CoreId, frame: impl Into<String>, coordinates: Vec<f64>) -> Self {
        ExecutionContext {
            core_id,
            frame: frame.into(),
            coordinates,
            gestalt: None,
        }
    }

    /// Placeholder context for a core that has not been registered with a
    /// shell yet.
    pub fn detached(core_id: CoreId) -> Self {
        ExecutionContext::new(core_id, "detached", Vec::new())
    }
}
