//! Aggregation Consumer
//!
//! ## Overview
//!
//! Blocks on the readiness barrier until both sensors have published a fresh
//! value, then reads the shared state in a single critical section so the
//! pair of values it folds actually coexisted. Raw values accumulate into
//! per-sensor rolling statistics; every ten satisfied windows a summary
//! (min, max, average) goes out through the [`SummarySink`] and the
//! statistics reset.
//!
//! ## Degraded modes
//!
//! A partial timeout (one or both sensors missed the window) is routine, not
//! an error: the missing sensors are logged and the whole window contributes
//! nothing to the statistics. A sensor that is late every single window stays
//! in the required set regardless; the barrier keeps reporting it missing,
//! which is exactly the diagnostic signal an operator needs. A lock timeout
//! on the snapshot likewise skips the window.

use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::barrier::{ReadinessBarrier, SensorSet, WaitOutcome};
use crate::reading::{SensorId, RAW_MAX};
use crate::shutdown::Shutdown;
use crate::store::SharedStateStore;

/// Rolling min/max/sum/count over raw values for one sensor.
#[derive(Debug, Clone, Copy)]
pub struct RollingStats {
    /// Smallest raw value seen this window.
    pub min: u16,
    /// Largest raw value seen this window.
    pub max: u16,
    /// Sum of raw values, for the average.
    pub sum: f32,
    /// Number of folded samples.
    pub count: u32,
}

impl RollingStats {
    fn new() -> Self {
        Self { min: RAW_MAX, max: 0, sum: 0.0, count: 0 }
    }

    fn fold(&mut self, raw: u16) {
        self.min = self.min.min(raw);
        self.max = self.max.max(raw);
        self.sum += raw as f32;
        self.count += 1;
    }

    fn average(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f32
        }
    }
}

/// Per-sensor slice of an emitted summary.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorSummary {
    /// Sensor the numbers belong to.
    pub sensor: SensorId,
    /// Smallest raw value in the window.
    pub min: u16,
    /// Largest raw value in the window.
    pub max: u16,
    /// Mean raw value over the window.
    pub average: f32,
    /// Samples folded into this window.
    pub samples: u32,
}

/// Statistics over one emitted window, all sensors.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindowSummary {
    /// One entry per sensor, in `SensorId::ALL` order.
    pub sensors: [SensorSummary; SensorId::COUNT],
}

/// Destination for emitted summaries.
///
/// Fire-and-forget: a sink must not block the aggregator.
pub trait SummarySink: Send {
    /// Deliver one finished window.
    fn publish(&self, summary: &WindowSummary);
}

/// Default sink, writes the summary to the log.
pub struct LogSink;

impl SummarySink for LogSink {
    fn publish(&self, summary: &WindowSummary) {
        log::info!("===== sensor summary (last {} windows) =====", summary.sensors[0].samples);
        for s in &summary.sensors {
            log::info!(
                "  {}: min={}, max={}, avg={:.0}",
                s.sensor.name(),
                s.min,
                s.max,
                s.average
            );
        }
    }
}

/// Barrier-driven statistics consumer.
pub struct Aggregator<S: SummarySink> {
    barrier: Arc<ReadinessBarrier>,
    store: Arc<SharedStateStore>,
    sink: S,
    barrier_timeout: Duration,
    window_len: u32,
    stats: [RollingStats; SensorId::COUNT],
    windows: u32,
}

impl<S: SummarySink> Aggregator<S> {
    /// Wire an aggregator to its collaborators.
    ///
    /// `window_len` is the number of satisfied readiness windows per emitted
    /// summary.
    pub fn new(
        barrier: Arc<ReadinessBarrier>,
        store: Arc<SharedStateStore>,
        sink: S,
        barrier_timeout: Duration,
        window_len: u32,
    ) -> Self {
        Self {
            barrier,
            store,
            sink,
            barrier_timeout,
            window_len,
            stats: [RollingStats::new(); SensorId::COUNT],
            windows: 0,
        }
    }

    /// One barrier wait plus its bookkeeping.
    ///
    /// Returns the summary if this window completed one. Public so tests can
    /// run windows deterministically.
    pub fn run_window(&mut self) -> Option<WindowSummary> {
        match self.barrier.wait_all(SensorSet::ALL, self.barrier_timeout) {
            WaitOutcome::Satisfied => {
                let snapshot = match self.store.snapshot() {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        log::warn!("aggregation window skipped: {err}");
                        return None;
                    }
                };
                for id in SensorId::ALL {
                    if let Some(reading) = snapshot[id.index()] {
                        self.stats[id.index()].fold(reading.raw);
                    }
                }
                self.windows += 1;
            }
            WaitOutcome::PartialTimeout(missing) => {
                // Stale bounds stay in place; this window adds nothing.
                for id in SensorId::ALL.into_iter().filter(|id| missing.contains(*id)) {
                    log::warn!("{} sensor missed the aggregation window", id.name());
                }
            }
        }

        if self.windows >= self.window_len {
            let summary = self.emit();
            Some(summary)
        } else {
            None
        }
    }

    fn emit(&mut self) -> WindowSummary {
        let build = |id: SensorId| {
            let s = &self.stats[id.index()];
            SensorSummary {
                sensor: id,
                min: s.min,
                max: s.max,
                average: s.average(),
                samples: s.count,
            }
        };
        let summary = WindowSummary {
            sensors: [build(SensorId::Light), build(SensorId::Water)],
        };
        self.sink.publish(&summary);
        self.stats = [RollingStats::new(); SensorId::COUNT];
        self.windows = 0;
        summary
    }

    /// Task body: windows forever, until shutdown.
    pub fn run(&mut self, shutdown: &Shutdown) {
        log::info!("aggregator started, summary every {} windows", self.window_len);
        while !shutdown.is_triggered() {
            self.run_window();
        }
        log::info!("aggregator stopped");
    }
}
