//! Actuator Outputs
//!
//! ## Overview
//!
//! The two lamps behind one lock, in the same shape as the sensor bank: a
//! hardware seam ([`OutputDrive`]) wrapped by a bank that serializes state
//! changes and tracks the logical on/off state. All mutation goes through
//! `set`, `toggle` or their `try_` variants, so the mirrored state and the
//! pin level cannot diverge.
//!
//! The bounded-wait accessors are for task contexts. The timer callback that
//! blinks the lamps must not wait at all, so it uses
//! [`ActuatorBank::try_toggle`], which skips the tick on contention instead
//! of sleeping.

use std::time::Duration;

use parking_lot::Mutex;

use crate::errors::{ControlError, ControlResult};

/// The controllable outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ActuatorId {
    /// Yellow lamp on the roof.
    RoofLamp = 0,
    /// White lamp in the garden.
    GardenLamp = 1,
}

impl ActuatorId {
    /// Number of actuators.
    pub const COUNT: usize = 2;

    /// All actuators.
    pub const ALL: [ActuatorId; Self::COUNT] = [ActuatorId::RoofLamp, ActuatorId::GardenLamp];

    /// Table index for this actuator.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Convert an untyped index from an external surface.
    pub fn from_index(index: usize) -> Result<Self, ControlError> {
        match index {
            0 => Ok(ActuatorId::RoofLamp),
            1 => Ok(ActuatorId::GardenLamp),
            _ => Err(ControlError::InvalidId { index, count: Self::COUNT }),
        }
    }

    /// Human-readable name for logs.
    pub const fn name(self) -> &'static str {
        match self {
            ActuatorId::RoofLamp => "roof lamp",
            ActuatorId::GardenLamp => "garden lamp",
        }
    }
}

/// Hardware seam for driving an output pin.
pub trait OutputDrive: Send {
    /// Drive the physical output for `id` to the given level.
    fn drive(&mut self, id: ActuatorId, on: bool);
}

struct BankInner<D> {
    drive: D,
    states: [bool; ActuatorId::COUNT],
}

/// Serialized actuator state behind one bounded-wait lock.
pub struct ActuatorBank<D: OutputDrive> {
    inner: Mutex<BankInner<D>>,
    lock_timeout: Duration,
}

impl<D: OutputDrive> ActuatorBank<D> {
    /// Wrap a drive with all outputs off.
    pub fn new(mut drive: D, lock_timeout: Duration) -> Self {
        for id in ActuatorId::ALL {
            drive.drive(id, false);
        }
        Self {
            inner: Mutex::new(BankInner { drive, states: [false; ActuatorId::COUNT] }),
            lock_timeout,
        }
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut BankInner<D>) -> R) -> ControlResult<R> {
        match self.inner.try_lock_for(self.lock_timeout) {
            Some(mut guard) => Ok(f(&mut guard)),
            None => Err(ControlError::LockTimeout {
                resource: "actuator_bank",
                waited_ms: self.lock_timeout.as_millis() as u64,
            }),
        }
    }

    /// Set one output to a definite state.
    pub fn set(&self, id: ActuatorId, on: bool) -> ControlResult<()> {
        self.with_inner(|inner| {
            inner.drive.drive(id, on);
            inner.states[id.index()] = on;
        })?;
        log::debug!("{} set {}", id.name(), if on { "on" } else { "off" });
        Ok(())
    }

    /// Flip one output.
    pub fn toggle(&self, id: ActuatorId) -> ControlResult<bool> {
        let now = self.with_inner(|inner| {
            let next = !inner.states[id.index()];
            inner.drive.drive(id, next);
            inner.states[id.index()] = next;
            next
        })?;
        log::debug!("{} toggled {}", id.name(), if now { "on" } else { "off" });
        Ok(now)
    }

    /// Current logical state of one output.
    pub fn get(&self, id: ActuatorId) -> ControlResult<bool> {
        self.with_inner(|inner| inner.states[id.index()])
    }

    /// Non-waiting toggle for callback contexts.
    ///
    /// Returns `None` when the lock is contended; the caller skips this tick.
    pub fn try_toggle(&self, id: ActuatorId) -> Option<bool> {
        self.inner.try_lock().map(|mut inner| {
            let next = !inner.states[id.index()];
            inner.drive.drive(id, next);
            inner.states[id.index()] = next;
            next
        })
    }

    /// Non-waiting set for callback contexts.
    ///
    /// Returns `false` when the lock is contended and nothing was driven.
    pub fn try_set(&self, id: ActuatorId, on: bool) -> bool {
        match self.inner.try_lock() {
            Some(mut inner) => {
                inner.drive.drive(id, on);
                inner.states[id.index()] = on;
                true
            }
            None => false,
        }
    }
}

/// In-memory drive for tests and demos; remembers every transition.
pub struct SimulatedDrive {
    /// Levels driven so far, in order.
    pub transitions: Vec<(ActuatorId, bool)>,
}

impl SimulatedDrive {
    /// Empty drive.
    pub fn new() -> Self {
        Self { transitions: Vec::new() }
    }
}

impl Default for SimulatedDrive {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDrive for SimulatedDrive {
    fn drive(&mut self, id: ActuatorId, on: bool) {
        self.transitions.push((id, on));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> ActuatorBank<SimulatedDrive> {
        ActuatorBank::new(SimulatedDrive::new(), Duration::from_millis(100))
    }

    #[test]
    fn outputs_start_off() {
        let bank = bank();
        for id in ActuatorId::ALL {
            assert_eq!(bank.get(id).unwrap(), false);
        }
    }

    #[test]
    fn set_and_get_agree() {
        let bank = bank();
        bank.set(ActuatorId::RoofLamp, true).unwrap();
        assert!(bank.get(ActuatorId::RoofLamp).unwrap());
        assert!(!bank.get(ActuatorId::GardenLamp).unwrap());
    }

    #[test]
    fn toggle_alternates() {
        let bank = bank();
        assert!(bank.toggle(ActuatorId::GardenLamp).unwrap());
        assert!(!bank.toggle(ActuatorId::GardenLamp).unwrap());
    }

    #[test]
    fn try_toggle_skips_on_contention() {
        let bank = bank();
        let guard = bank.inner.lock();
        assert_eq!(bank.try_toggle(ActuatorId::RoofLamp), None);
        drop(guard);
        assert_eq!(bank.try_toggle(ActuatorId::RoofLamp), Some(true));
    }

    #[test]
    fn try_set_skips_on_contention() {
        let bank = bank();
        let guard = bank.inner.lock();
        assert!(!bank.try_set(ActuatorId::GardenLamp, true));
        drop(guard);
        assert!(bank.try_set(ActuatorId::GardenLamp, true));
        assert!(bank.get(ActuatorId::GardenLamp).unwrap());
    }

    #[test]
    fn from_index_rejects_out_of_range() {
        assert_eq!(
            ActuatorId::from_index(9),
            Err(ControlError::InvalidId { index: 9, count: 2 })
        );
    }
}
