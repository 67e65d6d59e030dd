//! Sampling Sources
//!
//! ## Overview
//!
//! [`SensorBank`] owns the ADC and the per-sensor calibration table behind a
//! single bounded-wait lock, mirroring the way a shared ADC peripheral is
//! protected on the device. [`SensorBank::read`] produces a complete
//! [`Reading`]: raw sample, calibrated value, unit label and timestamp.
//!
//! Lock discipline: the lock covers only the raw ADC access and the copy of
//! the calibration in force. Calibration math and timestamping happen after
//! release, so a slow conversion never extends the contention window.
//!
//! The hardware itself sits behind the [`AdcRead`] seam. Production code
//! plugs in a thin wrapper over the real driver; tests and demos use
//! [`SimulatedAdc`].

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;

use crate::errors::{ControlError, ControlResult};
use crate::reading::{CalibrationPolicy, Reading, SensorId};
use crate::time::Clock;

/// Raw sample acquisition, one value per call.
///
/// Implementations wrap the actual ADC driver. A failed conversion is
/// reported as [`ControlError::HardwareRead`]; the caller skips the sensor
/// for the current cycle.
pub trait AdcRead: Send {
    /// Read one raw count from the given channel.
    fn read_raw(&mut self, channel: u8) -> ControlResult<u16>;
}

/// Per-sensor configuration guarded by the bank lock.
#[derive(Debug, Clone, Copy)]
struct SensorConfig {
    calibration: CalibrationPolicy,
    unit: &'static str,
}

struct BankInner<A> {
    adc: A,
    configs: [SensorConfig; SensorId::COUNT],
}

/// The two sampling sources behind one bounded-wait lock.
pub struct SensorBank<A: AdcRead> {
    inner: Mutex<BankInner<A>>,
    lock_timeout: Duration,
}

impl<A: AdcRead> SensorBank<A> {
    /// Wrap an ADC with default calibration (raw pass-through) on all
    /// sensors.
    ///
    /// `lock_timeout` bounds every wait on the internal lock.
    pub fn new(adc: A, lock_timeout: Duration) -> Self {
        let config = SensorConfig { calibration: CalibrationPolicy::Raw, unit: "raw" };
        Self {
            inner: Mutex::new(BankInner { adc, configs: [config; SensorId::COUNT] }),
            lock_timeout,
        }
    }

    /// Scoped lock with bounded wait.
    ///
    /// Single choke point for the wait-and-check logic so every accessor
    /// shares identical timeout semantics.
    fn with_inner<R>(&self, f: impl FnOnce(&mut BankInner<A>) -> R) -> ControlResult<R> {
        match self.inner.try_lock_for(self.lock_timeout) {
            Some(mut guard) => Ok(f(&mut guard)),
            None => Err(ControlError::LockTimeout {
                resource: "sensor_bank",
                waited_ms: self.lock_timeout.as_millis() as u64,
            }),
        }
    }

    /// Sample one sensor and build a calibrated reading.
    ///
    /// Holds the bank lock for the ADC access and the calibration copy only.
    pub fn read(&self, id: SensorId, clock: &dyn Clock) -> ControlResult<Reading> {
        let (raw, config) = self.with_inner(|inner| {
            let raw = inner.adc.read_raw(id.channel())?;
            Ok::<_, ControlError>((raw, inner.configs[id.index()]))
        })??;

        // Lock released; pure math from here on.
        Ok(Reading {
            sensor: id,
            raw,
            calibrated: config.calibration.apply(raw),
            unit: config.unit,
            timestamp: clock.now(),
        })
    }

    /// Replace the calibration for one sensor.
    ///
    /// The swap happens under the bank lock, so concurrent reads see either
    /// the old policy or the new one in full.
    pub fn set_calibration(
        &self,
        id: SensorId,
        policy: CalibrationPolicy,
        unit: &'static str,
    ) -> ControlResult<()> {
        self.with_inner(|inner| {
            inner.configs[id.index()] = SensorConfig { calibration: policy, unit };
        })?;
        log::info!("sensor {} calibration updated ({unit})", id.name());
        Ok(())
    }

    /// Current calibration and unit for one sensor.
    pub fn calibration(&self, id: SensorId) -> ControlResult<(CalibrationPolicy, &'static str)> {
        self.with_inner(|inner| {
            let config = inner.configs[id.index()];
            (config.calibration, config.unit)
        })
    }
}

/// Scripted ADC for tests and demos.
///
/// Each channel holds a queue of samples. A channel that runs out of samples
/// replays its last value forever; a scripted failure is consumed once and
/// surfaces as [`ControlError::HardwareRead`].
pub struct SimulatedAdc {
    channels: [VecDeque<Result<u16, ()>>; SensorId::COUNT],
    last: [u16; SensorId::COUNT],
}

impl SimulatedAdc {
    /// Empty simulator; every channel replays 0 until scripted.
    pub fn new() -> Self {
        Self {
            channels: [VecDeque::new(), VecDeque::new()],
            last: [0; SensorId::COUNT],
        }
    }

    /// Append a sequence of good samples to a sensor's script.
    pub fn script(mut self, id: SensorId, samples: &[u16]) -> Self {
        self.channels[id.index()].extend(samples.iter().map(|&s| Ok(s)));
        self
    }

    /// Append one failed conversion to a sensor's script.
    pub fn script_failure(mut self, id: SensorId) -> Self {
        self.channels[id.index()].push_back(Err(()));
        self
    }
}

impl Default for SimulatedAdc {
    fn default() -> Self {
        Self::new()
    }
}

impl AdcRead for SimulatedAdc {
    fn read_raw(&mut self, channel: u8) -> ControlResult<u16> {
        let slot = channel as usize;
        if slot >= SensorId::COUNT {
            return Err(ControlError::HardwareRead { channel });
        }
        match self.channels[slot].pop_front() {
            Some(Ok(raw)) => {
                self.last[slot] = raw;
                Ok(raw)
            }
            Some(Err(())) => Err(ControlError::HardwareRead { channel }),
            None => Ok(self.last[slot]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;

    fn bank_with(adc: SimulatedAdc) -> SensorBank<SimulatedAdc> {
        SensorBank::new(adc, Duration::from_millis(100))
    }

    #[test]
    fn read_produces_calibrated_reading() {
        let adc = SimulatedAdc::new().script(SensorId::Light, &[2048]);
        let bank = bank_with(adc);
        let clock = ManualClock::new(42);

        bank.set_calibration(
            SensorId::Light,
            CalibrationPolicy::Linear { slope: 0.5, intercept: 1.0 },
            "lux",
        )
        .unwrap();

        let reading = bank.read(SensorId::Light, &clock).unwrap();
        assert_eq!(reading.sensor, SensorId::Light);
        assert_eq!(reading.raw, 2048);
        assert_eq!(reading.calibrated, 1025.0);
        assert_eq!(reading.unit, "lux");
        assert_eq!(reading.timestamp, 42);
    }

    #[test]
    fn default_calibration_is_raw() {
        let adc = SimulatedAdc::new().script(SensorId::Water, &[123]);
        let bank = bank_with(adc);
        let clock = ManualClock::new(0);

        let reading = bank.read(SensorId::Water, &clock).unwrap();
        assert_eq!(reading.calibrated, 123.0);
        assert_eq!(reading.unit, "raw");
    }

    #[test]
    fn scripted_failure_surfaces_as_hardware_error() {
        let adc = SimulatedAdc::new()
            .script_failure(SensorId::Light)
            .script(SensorId::Light, &[10]);
        let bank = bank_with(adc);
        let clock = ManualClock::new(0);

        assert_eq!(
            bank.read(SensorId::Light, &clock),
            Err(ControlError::HardwareRead { channel: 0 })
        );
        // Next cycle succeeds; no retry happened inside the failed read.
        assert_eq!(bank.read(SensorId::Light, &clock).unwrap().raw, 10);
    }

    #[test]
    fn exhausted_script_replays_last_value() {
        let adc = SimulatedAdc::new().script(SensorId::Light, &[7]);
        let bank = bank_with(adc);
        let clock = ManualClock::new(0);

        assert_eq!(bank.read(SensorId::Light, &clock).unwrap().raw, 7);
        assert_eq!(bank.read(SensorId::Light, &clock).unwrap().raw, 7);
    }
}
