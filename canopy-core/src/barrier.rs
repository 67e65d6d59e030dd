//! Readiness Barrier
//!
//! ## Overview
//!
//! A fixed set of per-sensor readiness bits that independent producers raise
//! and a single consumer waits on. The aggregator calls
//! [`ReadinessBarrier::wait_all`] for the full set: it is released only when
//! every required bit is up (a rendezvous, not a first-ready notification),
//! or when the timeout elapses.
//!
//! ## Protocol
//!
//! - [`signal`](ReadinessBarrier::signal) is an idempotent atomic bit set.
//!   Producers never take a lock to signal; setting an already-set bit is a
//!   no-op.
//! - On a satisfied wait, exactly the required bits are cleared, arming the
//!   barrier for the next cycle. The producer never clears bits.
//! - On timeout the bits stay as they are, so a signal that arrives late is
//!   not lost; it counts toward the next wait. The outcome reports which
//!   bits were missing so a slow sensor is individually diagnosable.
//!
//! Only one consumer may wait on a given bit set at a time. The clear-on-wake
//! step consumes the signals, so concurrent waiters would race for them; a
//! broadcast primitive would be needed for that, and this core does not
//! provide one.
//!
//! ## Why a condvar next to the atomic?
//!
//! The bits themselves are lock-free, but a blocking wait needs a place to
//! sleep. `signal` takes the waiter's mutex for an empty critical section
//! before notifying, which closes the gap between the waiter's predicate
//! check and its sleep; without it a wakeup could slip through and turn into
//! a full timeout of latency.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::reading::SensorId;

/// A set of sensor readiness bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorSet(u8);

impl SensorSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Every sensor.
    pub const ALL: Self = Self((1 << SensorId::COUNT) - 1);

    /// Set containing a single sensor.
    pub const fn of(id: SensorId) -> Self {
        Self(1 << id.index())
    }

    /// Whether the set contains the given sensor.
    pub const fn contains(self, id: SensorId) -> bool {
        self.0 & (1 << id.index()) != 0
    }

    /// Union with another set.
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether every bit of `required` is present in `self`.
    pub const fn covers(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    /// True when no bits are set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Sensors in `required` that are absent from `self`.
    pub fn missing_from(self, required: Self) -> impl Iterator<Item = SensorId> {
        let gaps = required.0 & !self.0;
        SensorId::ALL.into_iter().filter(move |id| gaps & (1 << id.index()) != 0)
    }
}

/// Result of a barrier wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// All required bits were set; they have been cleared for the next cycle.
    Satisfied,
    /// The timeout elapsed first. Carries the bits that never arrived; the
    /// bits that did arrive remain set.
    PartialTimeout(SensorSet),
}

/// Multi-producer, single-consumer readiness barrier.
pub struct ReadinessBarrier {
    bits: AtomicU8,
    waiter: Mutex<()>,
    wake: Condvar,
}

impl ReadinessBarrier {
    /// Barrier with all bits clear.
    pub fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
            waiter: Mutex::new(()),
            wake: Condvar::new(),
        }
    }

    /// Raise one sensor's readiness bit. Idempotent, never blocks the
    /// producer beyond a notify.
    pub fn signal(&self, id: SensorId) {
        self.bits.fetch_or(SensorSet::of(id).0, Ordering::AcqRel);
        // Empty critical section: orders this signal against a waiter that
        // has checked the bits but not yet gone to sleep.
        drop(self.waiter.lock());
        self.wake.notify_all();
    }

    /// Block until every bit in `required` is set, or until `timeout`.
    ///
    /// Consumes the required bits on success. Single-consumer only; see the
    /// module docs.
    pub fn wait_all(&self, required: SensorSet, timeout: Duration) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        let mut guard = self.waiter.lock();
        loop {
            let current = SensorSet(self.bits.load(Ordering::Acquire));
            if current.covers(required) {
                self.bits.fetch_and(!required.0, Ordering::AcqRel);
                return WaitOutcome::Satisfied;
            }
            if self.wake.wait_until(&mut guard, deadline).timed_out() {
                let now = SensorSet(self.bits.load(Ordering::Acquire));
                if now.covers(required) {
                    // Signal landed right at the deadline; still a win.
                    self.bits.fetch_and(!required.0, Ordering::AcqRel);
                    return WaitOutcome::Satisfied;
                }
                return WaitOutcome::PartialTimeout(SensorSet(required.0 & !now.0));
            }
        }
    }

    /// Current bits, for diagnostics only. Racy by nature.
    pub fn pending(&self) -> SensorSet {
        SensorSet(self.bits.load(Ordering::Acquire))
    }
}

impl Default for ReadinessBarrier {
    fn default() -> Self {
        Self::new()
    }
}
