//! Step and cycle arithmetic for the 12-step round
//!
//! The substrate advances a shared step counter by exactly one per tick.
//! Twelve steps make one cycle; the counter wraps to zero and the owning
//! shell increments its cycle count on every wrap.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of steps in one full cycle.
pub const STEPS_PER_CYCLE: u8 = 12;

/// Position in the 12-step round, always in `[0, 12)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Step(u8);

impl Step {
    pub const ZERO: Step = Step(0);

    /// Create a step, reducing the value modulo the cycle length.
    #[inline]
    pub fn new(value: u8) -> Self {
        Step(value % STEPS_PER_CYCLE)
    }

    #[inline]
    pub fn value(self) -> u8 {
        self.0
    }

    /// The successor step, plus whether the counter wrapped to zero.
    #[inline]
    pub fn next(self) -> (Step, bool) {
        let next = (self.0 + 1) % STEPS_PER_CYCLE;
        (Step(next), next == 0)
    }

    /// Synchronization points are steps 1-4 of each cycle: the four steps
    /// at which the shell broadcasts the gestalt to every core.
    #[inline]
    pub fn is_synchronization_point(self) -> bool {
        (1..=4).contains(&self.0)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step({}/{})", self.0, STEPS_PER_CYCLE)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
