//! Controller Configuration
//!
//! Every policy value in one place: periods, timeouts, capacities and
//! thresholds. Defaults match the deployed device; tests shrink the time
//! values to keep runs fast.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::control::HysteresisPolicy;
use crate::reading::SensorId;

/// Tunable policy values for the whole core.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControllerConfig {
    /// Sampler sleep between cycles.
    pub sample_period: Duration,
    /// Bounded wait on every general-purpose lock.
    pub lock_timeout: Duration,
    /// Bounded wait on a queue send before dropping.
    pub queue_timeout: Duration,
    /// Distribution queue capacity.
    pub queue_capacity: usize,
    /// How long the aggregator waits for both sensors.
    pub barrier_timeout: Duration,
    /// Satisfied windows per emitted summary.
    pub summary_window: u32,
    /// Blink period in default mode.
    pub blink_period: Duration,
    /// Blink period in shortened mode.
    pub blink_fast_period: Duration,
    /// Thresholds for the adaptive blink.
    pub hysteresis: HysteresisPolicy,
    /// Sensor whose raw value drives the blink period.
    pub watched_sensor: SensorId,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            sample_period: Duration::from_millis(2000),
            lock_timeout: Duration::from_millis(100),
            queue_timeout: Duration::from_millis(100),
            queue_capacity: 10,
            barrier_timeout: Duration::from_millis(5000),
            summary_window: 10,
            blink_period: Duration::from_millis(500),
            blink_fast_period: Duration::from_millis(200),
            hysteresis: HysteresisPolicy { upper: 30, lower: 15 },
            watched_sensor: SensorId::Light,
        }
    }
}
