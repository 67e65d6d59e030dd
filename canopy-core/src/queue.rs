//! Bounded Distribution Queue
//!
//! ## Overview
//!
//! Fixed-capacity FIFO carrying readings from the sampler to the streaming
//! consumer. The policy on a full queue is backpressure-by-drop: the sampler
//! waits at most a short bounded time, then discards the reading and keeps
//! its own period rather than stalling behind a slow consumer. Dropped
//! readings are observable only through the queue counters and a warning at
//! the call site; there is no replay.
//!
//! The receive side blocks indefinitely. The streaming consumer has no other
//! work by design, so an unbounded block is the efficient choice; it wakes
//! exactly when data arrives, with no polling. `recv` returns `None` only
//! once every sender is gone, which is the orderly-shutdown path.
//!
//! ## Counters
//!
//! [`QueueStats`] tracks pushed, popped and dropped totals with relaxed
//! atomics. They are health telemetry, not synchronization; readers may see
//! a count that lags an in-flight operation by one.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};

use crate::errors::{ControlError, ControlResult};
use crate::reading::Reading;

/// Running totals for queue health.
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Readings accepted into the queue.
    pub pushed: AtomicU32,
    /// Readings handed to the consumer.
    pub popped: AtomicU32,
    /// Readings dropped because the queue stayed full.
    pub dropped: AtomicU32,
}

/// Create a bounded reading queue of the given capacity.
pub fn reading_queue(capacity: usize) -> (ReadingSender, ReadingReceiver) {
    let (tx, rx) = bounded(capacity);
    let stats = Arc::new(QueueStats::default());
    (
        ReadingSender { tx, stats: Arc::clone(&stats) },
        ReadingReceiver { rx, stats },
    )
}

/// Producer half of the distribution queue.
#[derive(Clone)]
pub struct ReadingSender {
    tx: Sender<Reading>,
    stats: Arc<QueueStats>,
}

impl ReadingSender {
    /// Enqueue a reading, waiting at most `timeout` for space.
    ///
    /// On [`ControlError::QueueFull`] the reading has been dropped and
    /// counted. A vanished consumer is treated the same way; the producer
    /// never fails hard because of the downstream side.
    pub fn send(&self, reading: Reading, timeout: Duration) -> ControlResult<()> {
        match self.tx.send_timeout(reading, timeout) {
            Ok(()) => {
                self.stats.pushed.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(SendTimeoutError::Timeout(_)) | Err(SendTimeoutError::Disconnected(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                Err(ControlError::QueueFull)
            }
        }
    }

    /// Shared counters for this queue.
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    /// Owning handle to the counters, for status surfaces that outlive the
    /// borrow.
    pub fn stats_handle(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }
}

/// Consumer half of the distribution queue.
pub struct ReadingReceiver {
    rx: Receiver<Reading>,
    stats: Arc<QueueStats>,
}

impl ReadingReceiver {
    /// Block until a reading arrives.
    ///
    /// `None` means every sender has been dropped and the queue is drained;
    /// the consumer loop should exit.
    pub fn recv(&self) -> Option<Reading> {
        match self.rx.recv() {
            Ok(reading) => {
                self.stats.popped.fetch_add(1, Ordering::Relaxed);
                Some(reading)
            }
            Err(_) => None,
        }
    }

    /// Non-blocking receive, used by tests to drain deterministically.
    pub fn try_recv(&self) -> Option<Reading> {
        self.rx.try_recv().ok().map(|reading| {
            self.stats.popped.fetch_add(1, Ordering::Relaxed);
            reading
        })
    }

    /// Shared counters for this queue.
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::SensorId;

    const NO_WAIT: Duration = Duration::from_millis(0);

    fn reading(raw: u16) -> Reading {
        Reading {
            sensor: SensorId::Light,
            raw,
            calibrated: raw as f32,
            unit: "raw",
            timestamp: raw as u64,
        }
    }

    #[test]
    fn overflow_drops_and_counts() {
        let (tx, rx) = reading_queue(3);

        for i in 0..3 {
            tx.send(reading(i), NO_WAIT).unwrap();
        }
        // Capacity 3, fourth send must report full.
        assert_eq!(tx.send(reading(3), NO_WAIT), Err(ControlError::QueueFull));
        assert_eq!(tx.stats().dropped.load(Ordering::Relaxed), 1);

        // Draining one item makes room again.
        assert_eq!(rx.recv().unwrap().raw, 0);
        tx.send(reading(4), NO_WAIT).unwrap();
        assert_eq!(tx.stats().pushed.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn fifo_order_is_preserved() {
        let (tx, rx) = reading_queue(10);
        for i in 0..5 {
            tx.send(reading(i), NO_WAIT).unwrap();
        }
        for i in 0..5 {
            assert_eq!(rx.recv().unwrap().raw, i);
        }
    }

    #[test]
    fn recv_reports_disconnect_as_none() {
        let (tx, rx) = reading_queue(2);
        tx.send(reading(9), NO_WAIT).unwrap();
        drop(tx);

        // Buffered item still comes out, then the closed end shows.
        assert_eq!(rx.recv().unwrap().raw, 9);
        assert!(rx.recv().is_none());
    }

    #[test]
    fn counters_track_traffic() {
        let (tx, rx) = reading_queue(2);
        tx.send(reading(1), NO_WAIT).unwrap();
        tx.send(reading(2), NO_WAIT).unwrap();
        let _ = tx.send(reading(3), NO_WAIT);
        rx.recv().unwrap();

        assert_eq!(rx.stats().pushed.load(Ordering::Relaxed), 2);
        assert_eq!(rx.stats().popped.load(Ordering::Relaxed), 1);
        assert_eq!(rx.stats().dropped.load(Ordering::Relaxed), 1);
    }
}
