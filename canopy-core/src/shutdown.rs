//! Cooperative shutdown flag
//!
//! Task loops on the device run for the process lifetime; in tests and hosted
//! demos they need to stop. [`Shutdown`] is a condvar-backed flag whose
//! [`wait_for`](Shutdown::wait_for) doubles as the inter-cycle sleep: a pure
//! timed yield that returns early the moment shutdown is requested, so a task
//! sleeping out a 2 s period does not hold up teardown.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Shared stop flag with an interruptible timed wait.
pub struct Shutdown {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl Shutdown {
    /// New flag in the running state.
    pub fn new() -> Self {
        Self {
            stopped: Mutex::new(false),
            wake: Condvar::new(),
        }
    }

    /// Request shutdown and wake every sleeping task.
    pub fn trigger(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.stopped.lock()
    }

    /// Sleep for `period`, waking early on shutdown.
    ///
    /// Returns `true` when the task should stop. This is the only sleep the
    /// task loops use; none of them busy-wait.
    pub fn wait_for(&self, period: Duration) -> bool {
        let deadline = Instant::now() + period;
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.wake.wait_until(&mut stopped, deadline).timed_out() {
                return *stopped;
            }
        }
        true
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
