//! Shared State Store
//!
//! ## Overview
//!
//! One slot per sensor holding the most recent [`Reading`], protected by a
//! single bounded-wait lock. The sampler is the only writer; the aggregator
//! and the actuation loop read. Readers always get a copy, never a reference
//! into the guarded data, so a reader can never observe a slot mid-update.
//!
//! ## Lock discipline
//!
//! The lock is held only for the memory copy. Nothing under the lock does
//! I/O, calibration math or downstream signaling, which keeps the contention
//! window to a few dozen nanoseconds. Acquisition waits are bounded; a
//! timeout drops the operation and surfaces as
//! [`ControlError::LockTimeout`], which callers log and survive.
//!
//! The actuation loop runs in a timer callback that must never block, so it
//! uses [`SharedStateStore::try_read`], which gives up immediately on
//! contention instead of waiting.

use std::time::Duration;

use parking_lot::Mutex;

use crate::errors::{ControlError, ControlResult};
use crate::reading::{Reading, SensorId};

/// Latest reading per sensor behind one bounded-wait lock.
pub struct SharedStateStore {
    slots: Mutex<[Option<Reading>; SensorId::COUNT]>,
    lock_timeout: Duration,
}

impl SharedStateStore {
    /// Empty store; slots fill on the first successful sampler cycle.
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            slots: Mutex::new([None; SensorId::COUNT]),
            lock_timeout,
        }
    }

    /// Scoped lock with bounded wait, shared by every accessor.
    fn with_slots<R>(
        &self,
        f: impl FnOnce(&mut [Option<Reading>; SensorId::COUNT]) -> R,
    ) -> ControlResult<R> {
        match self.slots.try_lock_for(self.lock_timeout) {
            Some(mut guard) => Ok(f(&mut guard)),
            None => Err(ControlError::LockTimeout {
                resource: "shared_state",
                waited_ms: self.lock_timeout.as_millis() as u64,
            }),
        }
    }

    /// Overwrite the slot for the reading's sensor.
    ///
    /// All fields of the slot change together under the lock. On timeout the
    /// update is dropped; the caller decides whether to log and must not set
    /// the readiness bit.
    pub fn update(&self, reading: Reading) -> ControlResult<()> {
        self.with_slots(|slots| {
            slots[reading.sensor.index()] = Some(reading);
        })
    }

    /// Copy of the latest reading for one sensor.
    ///
    /// `None` means the sensor has not produced a successful update yet.
    pub fn read(&self, id: SensorId) -> ControlResult<Option<Reading>> {
        self.with_slots(|slots| slots[id.index()])
    }

    /// Copy of all slots taken in one critical section.
    ///
    /// The aggregator uses this so the values it pairs up were actually
    /// resident at the same instant.
    pub fn snapshot(&self) -> ControlResult<[Option<Reading>; SensorId::COUNT]> {
        self.with_slots(|slots| *slots)
    }

    /// Non-waiting read for callback contexts.
    ///
    /// Returns `None` both for "slot empty" and "lock contended"; the caller
    /// simply skips this tick either way.
    pub fn try_read(&self, id: SensorId) -> Option<Reading> {
        self.slots.try_lock().and_then(|slots| slots[id.index()])
    }
}
