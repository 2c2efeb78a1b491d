//! Coordinate system - execution context derivation
//!
//! Every registered core gets a frame and a stable position in a small
//! shared coordinate space. The projection is a deterministic hash of the
//! core id distributed over the basis by cosine; two shells derive the
//! same coordinates for the same id.

use std::f64::consts::PI;

use rondo_core::CoreId;
use rondo_mesh::ExecutionContext;

/// Number of basis axes in the shared coordinate space.
pub const BASIS_DIMENSIONS: usize = 5;

/// Projection substrate for core execution contexts.
#[derive(Clone, Debug)]
pub struct CoordinateSystem {
    dimensions: usize,
}

impl CoordinateSystem {
    pub fn new() -> Self {
        CoordinateSystem {
            dimensions: BASIS_DIMENSIONS,
        }
    }

    /// Derive the execution context a core inherits at registration. The
    /// gestalt slot starts empty; the shell fills it at synchronization
    /// points.
    pub fn derive_context(&self, core_id: &CoreId) -> ExecutionContext {
        ExecutionContext::new(
            core_id.clone(),
            format!("core-{core_id}"),
            self.project(core_id),
        )
    }

    /// Stable coordinates for a core id, one component per basis axis.
    pub fn project(&self, core_id: &CoreId) -> Vec<f64> {
        let mut hash: u32 = 0;
        for byte in core_id.as_str().bytes() {
            hash = (hash.wrapping_mul(31).wrapping_add(byte as u32)) % 1000;
        }

        (0..self.dimensions)
            .map(|axis| {
                let angle = (hash as usize + axis * 100) as f64 * PI / 500.0;
                angle.cos()
            })
            .collect()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

impl Default for CoordinateSystem {
    fn default() -> Self {
        CoordinateSystem::new()
    }
}
