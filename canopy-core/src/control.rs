//! Adaptive Actuation Loop
//!
//! ## Overview
//!
//! The blink callback runs in the timer context on every tick: it flips both
//! lamps, peeks at the latest light reading in the shared state, and adjusts
//! its own firing period through a hysteresis policy. Bright light makes the
//! blink fast; the default pace returns only once the value has fallen well
//! below the point that sped it up.
//!
//! ## Hysteresis
//!
//! Two thresholds, not one. Above `upper` the period shrinks; below `lower`
//! it restores; in between nothing changes. The dead band between the
//! thresholds is what stops the period from flapping when the sensor hovers
//! around a single boundary value.
//!
//! Everything here honors the timer-callback contract: lamp toggles use
//! `try_` accessors, the state read is non-waiting, and the period change is
//! an atomic store. A contended tick is skipped, never waited out.

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::actuator::{ActuatorBank, ActuatorId, OutputDrive};
use crate::reading::SensorId;
use crate::store::SharedStateStore;
use crate::timer::{TimerCallback, TimerHandle};

/// Which firing period the blink loop is running at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodMode {
    /// Normal pace.
    Default,
    /// Shrunk pace, entered above the upper threshold.
    Shortened,
}

/// Two-threshold policy with a dead band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HysteresisPolicy {
    /// Crossing above this raw value shrinks the period.
    pub upper: u16,
    /// Falling below this raw value restores the default period.
    pub lower: u16,
}

impl HysteresisPolicy {
    /// Next mode for a raw value, given the mode currently in force.
    ///
    /// Pure; values inside the dead band keep the current mode.
    pub fn evaluate(&self, raw: u16, current: PeriodMode) -> PeriodMode {
        if raw > self.upper {
            PeriodMode::Shortened
        } else if raw < self.lower {
            PeriodMode::Default
        } else {
            current
        }
    }
}

/// Timing and policy for the adaptive blink.
#[derive(Debug, Clone, Copy)]
pub struct BlinkPolicy {
    /// Hysteresis thresholds.
    pub hysteresis: HysteresisPolicy,
    /// Period in default mode.
    pub default_period: std::time::Duration,
    /// Period in shortened mode.
    pub fast_period: std::time::Duration,
    /// Sensor whose raw value drives the policy.
    pub watched: SensorId,
}

/// Timer callback that blinks the lamps and adapts its own pace.
pub struct AdaptiveBlink<D: OutputDrive> {
    actuators: Arc<ActuatorBank<D>>,
    store: Arc<SharedStateStore>,
    policy: BlinkPolicy,
    mode: PeriodMode,
}

impl<D: OutputDrive> AdaptiveBlink<D> {
    /// Build the callback; the timer starts in default mode.
    pub fn new(
        actuators: Arc<ActuatorBank<D>>,
        store: Arc<SharedStateStore>,
        policy: BlinkPolicy,
    ) -> Self {
        Self { actuators, store, policy, mode: PeriodMode::Default }
    }

    /// Mode currently in force, for tests and status surfaces.
    pub fn mode(&self) -> PeriodMode {
        self.mode
    }

    /// Policy step without the timer: read, evaluate, request.
    fn adapt(&mut self, handle: &TimerHandle) {
        let Some(reading) = self.store.try_read(self.policy.watched) else {
            // Nothing sampled yet, or the store is briefly contended.
            return;
        };

        let next = self.policy.hysteresis.evaluate(reading.raw, self.mode);
        if next != self.mode {
            let period = match next {
                PeriodMode::Default => self.policy.default_period,
                PeriodMode::Shortened => self.policy.fast_period,
            };
            log::info!(
                "blink period -> {} ms ({} raw {})",
                period.as_millis(),
                self.policy.watched.name(),
                reading.raw
            );
            handle.set_period(period);
            self.mode = next;
        }
    }
}

impl<D: OutputDrive + 'static> TimerCallback for AdaptiveBlink<D> {
    fn on_tick(&mut self, handle: &TimerHandle) {
        // Alternating pair: toggling both at once swaps which lamp is lit.
        for id in ActuatorId::ALL {
            if self.actuators.try_toggle(id).is_none() {
                log::debug!("{} busy, tick skipped", id.name());
            }
        }
        self.adapt(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::SimulatedDrive;
    use crate::reading::Reading;
    use crate::shutdown::Shutdown;
    use crate::timer::{FnTick, PeriodicTimer};
    use std::time::Duration;

    const POLICY: HysteresisPolicy = HysteresisPolicy { upper: 30, lower: 15 };

    #[test]
    fn hysteresis_follows_the_dead_band() {
        // Reference sequence: default at 10, shrink at 35, hold through 40
        // and 20, restore only at 10.
        let steps = [
            (10u16, PeriodMode::Default),
            (35, PeriodMode::Shortened),
            (40, PeriodMode::Shortened),
            (20, PeriodMode::Shortened),
            (10, PeriodMode::Default),
        ];

        let mut mode = PeriodMode::Default;
        for (raw, expected) in steps {
            mode = POLICY.evaluate(raw, mode);
            assert_eq!(mode, expected, "raw={raw}");
        }
    }

    #[test]
    fn boundary_values_sit_in_the_dead_band() {
        assert_eq!(POLICY.evaluate(30, PeriodMode::Default), PeriodMode::Default);
        assert_eq!(POLICY.evaluate(30, PeriodMode::Shortened), PeriodMode::Shortened);
        assert_eq!(POLICY.evaluate(15, PeriodMode::Default), PeriodMode::Default);
        assert_eq!(POLICY.evaluate(15, PeriodMode::Shortened), PeriodMode::Shortened);
    }

    fn blink_rig() -> (Arc<ActuatorBank<SimulatedDrive>>, Arc<SharedStateStore>, AdaptiveBlink<SimulatedDrive>) {
        let actuators = Arc::new(ActuatorBank::new(SimulatedDrive::new(), Duration::from_millis(100)));
        let store = Arc::new(SharedStateStore::new(Duration::from_millis(100)));
        let blink = AdaptiveBlink::new(
            Arc::clone(&actuators),
            Arc::clone(&store),
            BlinkPolicy {
                hysteresis: POLICY,
                default_period: Duration::from_millis(500),
                fast_period: Duration::from_millis(200),
                watched: SensorId::Light,
            },
        );
        (actuators, store, blink)
    }

    fn light(raw: u16) -> Reading {
        Reading { sensor: SensorId::Light, raw, calibrated: raw as f32, unit: "raw", timestamp: 0 }
    }

    #[test]
    fn callback_toggles_lamps_and_adapts_period() {
        let (actuators, store, mut blink) = blink_rig();

        // Drive ticks through a real handle without waiting on the thread's
        // own cadence.
        let shutdown = Arc::new(Shutdown::new());
        let timer = PeriodicTimer::spawn(
            "blink-test",
            Duration::from_secs(3600),
            Arc::clone(&shutdown),
            FnTick(|_: &TimerHandle| {}),
        )
        .unwrap();
        let handle = timer.handle();

        store.update(light(10)).unwrap();
        blink.on_tick(&handle);
        assert_eq!(blink.mode(), PeriodMode::Default);
        assert!(actuators.get(ActuatorId::RoofLamp).unwrap());

        store.update(light(35)).unwrap();
        blink.on_tick(&handle);
        assert_eq!(blink.mode(), PeriodMode::Shortened);
        assert_eq!(handle.period(), Duration::from_millis(200));
        assert!(!actuators.get(ActuatorId::RoofLamp).unwrap());

        store.update(light(20)).unwrap();
        blink.on_tick(&handle);
        // Dead band: period request untouched.
        assert_eq!(handle.period(), Duration::from_millis(200));

        store.update(light(10)).unwrap();
        blink.on_tick(&handle);
        assert_eq!(blink.mode(), PeriodMode::Default);
        assert_eq!(handle.period(), Duration::from_millis(500));

        shutdown.trigger();
        timer.join();
    }

    #[test]
    fn empty_store_leaves_period_alone() {
        let (_actuators, _store, mut blink) = blink_rig();
        let shutdown = Arc::new(Shutdown::new());
        let timer = PeriodicTimer::spawn(
            "blink-test",
            Duration::from_secs(3600),
            Arc::clone(&shutdown),
            FnTick(|_: &TimerHandle| {}),
        )
        .unwrap();
        let handle = timer.handle();

        blink.on_tick(&handle);
        assert_eq!(blink.mode(), PeriodMode::Default);
        assert_eq!(handle.period(), Duration::from_secs(3600));

        shutdown.trigger();
        timer.join();
    }
}
