//! Telemetry observations
//!
//! An observation is one core's sampled state and metrics at a point in
//! time, produced by the core's sampler and immutable once created. State
//! and metric values are dynamic JSON values; collaborators decide their
//! shape.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{CoreId, Timestamp};

/// Dynamic state value carried through the substrate.
pub type StateValue = serde_json::Value;

/// Named metric values attached to an observation.
pub type MetricMap = HashMap<String, StateValue>;

/// One core's sampled state and metrics at a point in time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelemetryObservation {
    pub core_id: CoreId,
    pub timestamp: Timestamp,
    pub metrics: MetricMap,
    pub state: StateValue,
}

impl TelemetryObservation {
    /// Create an observation stamped with the current time.
    pub fn new(core_id: CoreId, state: StateValue) -> Self {
        TelemetryObservation {
            core_id,
            timestamp: Timestamp::now(),
            metrics: MetricMap::new(),
            state,
        }
    }

    pub fn with_metric(mut self, key: impl Into<String>, value: StateValue) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }
}
