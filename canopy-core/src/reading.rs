//! Sensor Identifiers, Readings and Calibration
//!
//! ## Overview
//!
//! A [`Reading`] is the unit of data that flows through the whole core: the
//! periodic sampler builds one per sensor per cycle, copies it into the
//! distribution queue for the streaming consumer, and copies it again into
//! the shared state store for the aggregator and the actuation loop.
//! Readings are immutable once constructed and always consumed by value.
//!
//! ## Identifiers
//!
//! Sensors are addressed by the exhaustive [`SensorId`] enum rather than a
//! bare integer. Every table in the core is indexed through
//! [`SensorId::index`], so out-of-range access is impossible by construction.
//! The only fallible conversion is [`SensorId::from_index`], used at external
//! boundaries that hand us untyped indices.
//!
//! ## Calibration
//!
//! [`CalibrationPolicy`] maps a raw ADC count to a physical value. The policy
//! is owned by the sensor bank and swapped atomically under its lock, so a
//! concurrent read sees either the old or the new policy, never a mix of
//! coefficients.

use crate::time::Timestamp;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::ControlError;

/// Largest raw value the 12-bit ADC can produce.
pub const RAW_MAX: u16 = 4095;

/// The two environmental sensors the controller samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum SensorId {
    /// Ambient light sensor on the roof (ADC channel 0).
    Light = 0,
    /// Soil moisture sensor on the roof (ADC channel 1).
    Water = 1,
}

impl SensorId {
    /// Number of sensors.
    pub const COUNT: usize = 2;

    /// All sensors in fixed sampling order.
    ///
    /// The sampler walks this array every cycle, so the per-cycle read order
    /// is identical from one cycle to the next.
    pub const ALL: [SensorId; Self::COUNT] = [SensorId::Light, SensorId::Water];

    /// Table index for this sensor.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Convert an untyped index from an external surface.
    pub fn from_index(index: usize) -> Result<Self, ControlError> {
        match index {
            0 => Ok(SensorId::Light),
            1 => Ok(SensorId::Water),
            _ => Err(ControlError::InvalidId { index, count: Self::COUNT }),
        }
    }

    /// Human-readable name for logs and summaries.
    pub const fn name(self) -> &'static str {
        match self {
            SensorId::Light => "light",
            SensorId::Water => "water",
        }
    }

    /// Mounting location, kept for external status surfaces.
    pub const fn location(self) -> &'static str {
        match self {
            SensorId::Light => "roof",
            SensorId::Water => "roof",
        }
    }

    /// ADC channel this sensor is wired to.
    pub const fn channel(self) -> u8 {
        match self {
            SensorId::Light => 0,
            SensorId::Water => 1,
        }
    }
}

/// One calibrated sample from one sensor.
///
/// Created only by the sampler, copied to every consumer. `unit` is a static
/// label taken from the calibration in force when the sample was taken.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// Which sensor produced the sample.
    pub sensor: SensorId,
    /// Raw ADC count in `0..=RAW_MAX`.
    pub raw: u16,
    /// Value after applying the calibration policy.
    pub calibrated: f32,
    /// Unit label of the calibrated value, e.g. `"lux"` or `"raw"`.
    pub unit: &'static str,
    /// Monotonic milliseconds at sample time.
    pub timestamp: Timestamp,
}

/// Transform from raw ADC counts to a physical value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CalibrationPolicy {
    /// No transform, the calibrated value is the raw count.
    Raw,
    /// `y = slope * x + intercept`
    Linear {
        /// Scale factor.
        slope: f32,
        /// Offset added after scaling.
        intercept: f32,
    },
    /// `y = a * x^2 + b * x + c`
    Polynomial {
        /// Quadratic coefficient.
        a: f32,
        /// Linear coefficient.
        b: f32,
        /// Constant term.
        c: f32,
    },
}

impl CalibrationPolicy {
    /// Apply the policy to a raw count.
    pub fn apply(&self, raw: u16) -> f32 {
        let x = raw as f32;
        match *self {
            CalibrationPolicy::Raw => x,
            CalibrationPolicy::Linear { slope, intercept } => slope * x + intercept,
            CalibrationPolicy::Polynomial { a, b, c } => a * x * x + b * x + c,
        }
    }
}
