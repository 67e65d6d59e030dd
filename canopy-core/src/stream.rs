//! Streaming Consumer
//!
//! Pure consume loop on the distribution queue: block until a reading
//! arrives, log it, remember it. The task has no timer and no other duties,
//! which is what makes the unbounded blocking receive the right tool; the
//! thread is parked by the channel until data exists.
//!
//! The last few readings are kept in a fixed-size history so external
//! surfaces (status endpoints and the like) can show recent traffic without
//! touching the queue. The history is a bounded ring; old entries fall off,
//! nothing allocates after startup.

use std::sync::Arc;

use heapless::HistoryBuffer;
use parking_lot::Mutex;

use crate::queue::ReadingReceiver;
use crate::reading::Reading;

/// Capacity of the recent-readings window.
pub const RECENT_CAPACITY: usize = 32;

/// Cloneable read handle over the consumer's recent-readings window.
#[derive(Clone)]
pub struct RecentReadings {
    buffer: Arc<Mutex<HistoryBuffer<Reading, RECENT_CAPACITY>>>,
}

impl RecentReadings {
    fn new() -> Self {
        Self { buffer: Arc::new(Mutex::new(HistoryBuffer::new())) }
    }

    fn record(&self, reading: Reading) {
        self.buffer.lock().write(reading);
    }

    /// Most recent reading, if any traffic has arrived.
    pub fn latest(&self) -> Option<Reading> {
        self.buffer.lock().recent().copied()
    }

    /// Oldest-first copy of the window.
    pub fn snapshot(&self) -> Vec<Reading> {
        self.buffer.lock().oldest_ordered().copied().collect()
    }
}

/// Queue-draining consumer task.
pub struct StreamConsumer {
    rx: ReadingReceiver,
    recent: RecentReadings,
}

impl StreamConsumer {
    /// Attach a consumer to the receive half of the queue.
    pub fn new(rx: ReadingReceiver) -> Self {
        Self { rx, recent: RecentReadings::new() }
    }

    /// Handle for external surfaces; clone freely.
    pub fn recent(&self) -> RecentReadings {
        self.recent.clone()
    }

    /// Process one reading.
    fn handle(&self, reading: Reading) {
        log::info!(
            "{} sensor ({}): raw={}, calibrated={:.2} {}, time={} ms",
            reading.sensor.name(),
            reading.sensor.location(),
            reading.raw,
            reading.calibrated,
            reading.unit,
            reading.timestamp
        );
        self.recent.record(reading);
    }

    /// Task body: drain the queue until every sender is gone.
    ///
    /// No shutdown flag here; dropping the sampler's sender is what ends the
    /// loop, and it naturally drains buffered readings first.
    pub fn run(&self) {
        log::info!("stream consumer started");
        while let Some(reading) = self.rx.recv() {
            self.handle(reading);
        }
        log::info!("stream consumer stopped");
    }
}
