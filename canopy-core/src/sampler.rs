//! Periodic Sampler
//!
//! ## Overview
//!
//! The single producer of the whole core. Every cycle it walks the sensors in
//! fixed order and, for each one:
//!
//! 1. reads a calibrated [`Reading`] from the sensor bank,
//! 2. offers it to the distribution queue (best effort, drop on full),
//! 3. writes it to the shared state store (best effort, drop on lock
//!    timeout),
//! 4. raises the sensor's readiness bit, but only if step 3 succeeded.
//!
//! Step 4's condition is the one ordering rule that matters here: a readiness
//! bit promises the aggregator that the corresponding slot holds this cycle's
//! data. Signaling after a failed store update would hand the aggregator
//! stale values dressed up as fresh ones.
//!
//! Failures are per-sensor and per-cycle. A hardware error skips that sensor
//! until the next cycle; queue and store failures each drop exactly one copy
//! of the reading and are logged. Nothing retries inside a cycle.

use std::sync::Arc;
use std::time::Duration;

use crate::barrier::ReadinessBarrier;
use crate::queue::ReadingSender;
use crate::reading::SensorId;
use crate::sensor::{AdcRead, SensorBank};
use crate::shutdown::Shutdown;
use crate::store::SharedStateStore;
use crate::time::Clock;

/// Timing knobs for the sampler.
#[derive(Debug, Clone, Copy)]
pub struct SamplerTiming {
    /// Sleep between cycles.
    pub period: Duration,
    /// Bound on the queue send wait.
    pub queue_timeout: Duration,
}

/// Periodic producer task.
pub struct Sampler<A: AdcRead> {
    bank: Arc<SensorBank<A>>,
    queue: ReadingSender,
    store: Arc<SharedStateStore>,
    barrier: Arc<ReadinessBarrier>,
    clock: Arc<dyn Clock>,
    timing: SamplerTiming,
}

impl<A: AdcRead> Sampler<A> {
    /// Wire a sampler to its collaborators.
    pub fn new(
        bank: Arc<SensorBank<A>>,
        queue: ReadingSender,
        store: Arc<SharedStateStore>,
        barrier: Arc<ReadinessBarrier>,
        clock: Arc<dyn Clock>,
        timing: SamplerTiming,
    ) -> Self {
        Self { bank, queue, store, barrier, clock, timing }
    }

    /// Run one full cycle over all sensors.
    ///
    /// Public so tests can drive cycles without threads or real time.
    pub fn run_cycle(&self) {
        for id in SensorId::ALL {
            let reading = match self.bank.read(id, self.clock.as_ref()) {
                Ok(reading) => reading,
                Err(err) => {
                    log::error!("failed to read {} sensor: {err}", id.name());
                    continue;
                }
            };

            if let Err(err) = self.queue.send(reading, self.timing.queue_timeout) {
                log::warn!("dropping {} reading: {err}", id.name());
            }

            match self.store.update(reading) {
                Ok(()) => self.barrier.signal(id),
                // No signal here: the slot still holds the previous cycle.
                Err(err) => log::warn!("state update for {} dropped: {err}", id.name()),
            }
        }
    }

    /// Task body: cycle, then yield for the period, until shutdown.
    pub fn run(&self, shutdown: &Shutdown) {
        log::info!(
            "sampler started, period {} ms",
            self.timing.period.as_millis()
        );
        loop {
            self.run_cycle();
            if shutdown.wait_for(self.timing.period) {
                break;
            }
        }
        log::info!("sampler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barrier::{SensorSet, WaitOutcome};
    use crate::queue::reading_queue;
    use crate::sensor::SimulatedAdc;
    use crate::time::ManualClock;

    const SHORT: Duration = Duration::from_millis(10);

    struct Rig {
        sampler: Sampler<SimulatedAdc>,
        store: Arc<SharedStateStore>,
        barrier: Arc<ReadinessBarrier>,
        rx: crate::queue::ReadingReceiver,
    }

    fn rig(adc: SimulatedAdc, queue_capacity: usize) -> Rig {
        let bank = Arc::new(SensorBank::new(adc, Duration::from_millis(100)));
        let store = Arc::new(SharedStateStore::new(Duration::from_millis(100)));
        let barrier = Arc::new(ReadinessBarrier::new());
        let (tx, rx) = reading_queue(queue_capacity);
        let sampler = Sampler::new(
            bank,
            tx,
            Arc::clone(&store),
            Arc::clone(&barrier),
            Arc::new(ManualClock::new(0)),
            SamplerTiming { period: Duration::from_millis(2000), queue_timeout: SHORT },
        );
        Rig { sampler, store, barrier, rx }
    }

    #[test]
    fn cycle_publishes_to_queue_store_and_barrier() {
        let adc = SimulatedAdc::new()
            .script(SensorId::Light, &[100])
            .script(SensorId::Water, &[200]);
        let rig = rig(adc, 10);

        rig.sampler.run_cycle();

        assert_eq!(rig.rx.try_recv().unwrap().raw, 100);
        assert_eq!(rig.rx.try_recv().unwrap().raw, 200);
        assert_eq!(rig.store.read(SensorId::Water).unwrap().unwrap().raw, 200);
        assert_eq!(rig.barrier.wait_all(SensorSet::ALL, SHORT), WaitOutcome::Satisfied);
    }

    #[test]
    fn hardware_failure_skips_sensor_without_signaling() {
        let adc = SimulatedAdc::new()
            .script_failure(SensorId::Light)
            .script(SensorId::Water, &[55]);
        let rig = rig(adc, 10);

        rig.sampler.run_cycle();

        // Water published normally.
        assert_eq!(rig.store.read(SensorId::Water).unwrap().unwrap().raw, 55);
        // Light produced nothing anywhere.
        assert_eq!(rig.store.read(SensorId::Light).unwrap(), None);
        match rig.barrier.wait_all(SensorSet::ALL, SHORT) {
            WaitOutcome::PartialTimeout(missing) => {
                assert!(missing.contains(SensorId::Light));
                assert!(!missing.contains(SensorId::Water));
            }
            WaitOutcome::Satisfied => panic!("light must be missing"),
        }
    }

    #[test]
    fn full_queue_drops_reading_but_still_updates_state() {
        let adc = SimulatedAdc::new()
            .script(SensorId::Light, &[1, 2])
            .script(SensorId::Water, &[1, 2]);
        // Capacity 2 fills on the first cycle; the second cycle drops both.
        let rig = rig(adc, 2);

        rig.sampler.run_cycle();
        rig.sampler.run_cycle();

        let stats = rig.rx.stats();
        assert_eq!(stats.dropped.load(std::sync::atomic::Ordering::Relaxed), 2);
        // Shared state still carries the second cycle's values.
        assert_eq!(rig.store.read(SensorId::Light).unwrap().unwrap().raw, 2);
        assert_eq!(rig.barrier.wait_all(SensorSet::ALL, SHORT), WaitOutcome::Satisfied);
    }

    #[test]
    fn sensors_sampled_in_fixed_order() {
        let adc = SimulatedAdc::new()
            .script(SensorId::Light, &[10, 11])
            .script(SensorId::Water, &[20, 21]);
        let rig = rig(adc, 10);

        rig.sampler.run_cycle();
        rig.sampler.run_cycle();

        let order: Vec<_> = std::iter::from_fn(|| rig.rx.try_recv())
            .map(|r| (r.sensor, r.raw))
            .collect();
        assert_eq!(
            order,
            vec![
                (SensorId::Light, 10),
                (SensorId::Water, 20),
                (SensorId::Light, 11),
                (SensorId::Water, 21),
            ]
        );
    }
}
