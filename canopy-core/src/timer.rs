//! Periodic Timer Primitive
//!
//! A dedicated thread that fires a callback on a fixed period, standing in
//! for a hardware or OS software timer. The callback runs in the timer's own
//! context and is subject to a hard contract:
//!
//! - it must complete quickly,
//! - it must not block, sleep or wait on anything.
//!
//! A slow callback delays every later tick, and a blocking one wedges the
//! timer outright, so implementations stick to `try_` accessors and atomic
//! operations. The [`TimerCallback`] trait exists precisely to make that
//! context visible in the signature of the code that runs there.
//!
//! The firing period can be changed from inside the callback (or anywhere
//! else holding a [`TimerHandle`]): [`set_period`](TimerHandle::set_period)
//! is a single atomic store, effective from the next tick. That is the whole
//! extent of the "change period" protocol; nobody waits for an acknowledge.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::shutdown::Shutdown;

/// Control handle for a running timer.
#[derive(Clone)]
pub struct TimerHandle {
    period_ms: Arc<AtomicU64>,
}

impl TimerHandle {
    /// Request a new firing period; non-blocking, applies from the next
    /// tick.
    pub fn set_period(&self, period: Duration) {
        self.period_ms.store(period.as_millis() as u64, Ordering::Relaxed);
    }

    /// Period currently in force.
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms.load(Ordering::Relaxed))
    }
}

/// Code run in the timer context. Must not block; see the module docs.
pub trait TimerCallback: Send + 'static {
    /// One tick. `handle` allows period changes from inside the callback.
    fn on_tick(&mut self, handle: &TimerHandle);
}

/// Adapter running a closure as a [`TimerCallback`].
pub struct FnTick<F>(pub F);

impl<F: FnMut(&TimerHandle) + Send + 'static> TimerCallback for FnTick<F> {
    fn on_tick(&mut self, handle: &TimerHandle) {
        (self.0)(handle)
    }
}

/// A spawned periodic timer.
pub struct PeriodicTimer {
    handle: TimerHandle,
    join: JoinHandle<()>,
}

impl PeriodicTimer {
    /// Spawn a timer thread firing `callback` every `period`.
    ///
    /// The timer is auto-reloading: it keeps firing until `shutdown`
    /// triggers.
    pub fn spawn(
        name: &str,
        period: Duration,
        shutdown: Arc<Shutdown>,
        mut callback: impl TimerCallback,
    ) -> std::io::Result<Self> {
        let period_ms = Arc::new(AtomicU64::new(period.as_millis() as u64));
        let handle = TimerHandle { period_ms };
        let cb_handle = handle.clone();

        let join = thread::Builder::new().name(name.to_owned()).spawn(move || {
            log::info!("timer started, period {} ms", cb_handle.period().as_millis());
            loop {
                if shutdown.wait_for(cb_handle.period()) {
                    break;
                }
                callback.on_tick(&cb_handle);
            }
            log::info!("timer stopped");
        })?;

        Ok(Self { handle, join })
    }

    /// Control handle; clone freely.
    pub fn handle(&self) -> TimerHandle {
        self.handle.clone()
    }

    /// Wait for the timer thread to exit after shutdown was triggered.
    pub fn join(self) {
        if self.join.join().is_err() {
            log::error!("timer thread panicked");
        }
    }
}
