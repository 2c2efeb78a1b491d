//! Shell configuration

use std::time::Duration;

use rondo_core::STEPS_PER_CYCLE;

/// The single options record for a shell. One cycle is twelve steps;
/// `cycle_duration` is informational and kept consistent by the
/// constructors.
#[derive(Clone, Debug)]
pub struct ShellConfig {
    /// Duration of one full 12-step cycle.
    pub cycle_duration: Duration,
    /// Duration of one step; the cadence of the tick loop.
    pub step_duration: Duration,
    /// Period of the telemetry sampling loop.
    pub telemetry_rate: Duration,
    /// Capacity of the telemetry observation queue, channels created from
    /// this config, and the shell's internal buffers.
    pub buffer_size: usize,
    /// Capacity of the gestalt snapshot history.
    pub max_history_size: usize,
    /// Accepted for forward compatibility; not wired to any behavior.
    pub enable_anomaly_detection: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        ShellConfig::with_step_duration(Duration::from_millis(100))
    }
}

impl ShellConfig {
    /// Config with a given step duration and the default rates and sizes.
    pub fn with_step_duration(step_duration: Duration) -> Self {
        ShellConfig {
            cycle_duration: step_duration * STEPS_PER_CYCLE as u32,
            step_duration,
            telemetry_rate: Duration::from_millis(50),
            buffer_size: 1000,
            max_history_size: 100,
            enable_anomaly_detection: true,
        }
    }
}
