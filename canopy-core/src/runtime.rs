//! Controller Wiring
//!
//! ## Overview
//!
//! [`Controller::start`] builds every shared primitive once, hands each task
//! an explicit handle to exactly what it touches, and spawns the task
//! threads. There are no process-wide statics: everything shared lives in
//! [`CoreContext`], which external surfaces (an HTTP layer, a console) can
//! borrow to read state and drive actuators.
//!
//! Tasks and their roles:
//!
//! | thread       | role                                            |
//! |--------------|-------------------------------------------------|
//! | `sampler`    | periodic producer, drives everything downstream |
//! | `streamer`   | drains the distribution queue                   |
//! | `aggregator` | barrier-driven rolling statistics               |
//! | `blink`      | timer context for the adaptive actuation loop   |
//!
//! Shutdown is cooperative and ordered: the flag wakes the sampler and the
//! aggregator out of their timed waits, the sampler's exit drops the queue
//! sender, and that in turn drains and stops the streamer. `shutdown()` only
//! returns once every thread has been joined.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::actuator::{ActuatorBank, OutputDrive};
use crate::aggregate::{Aggregator, LogSink};
use crate::barrier::ReadinessBarrier;
use crate::config::ControllerConfig;
use crate::control::{AdaptiveBlink, BlinkPolicy};
use crate::queue::{reading_queue, QueueStats};
use crate::sampler::{Sampler, SamplerTiming};
use crate::sensor::{AdcRead, SensorBank};
use crate::shutdown::Shutdown;
use crate::store::SharedStateStore;
use crate::stream::{RecentReadings, StreamConsumer};
use crate::timer::PeriodicTimer;
use crate::time::Clock;

/// Stack budget for task threads. Generous on a hosted target; the embedded
/// build keeps the same shape with per-task budgets.
const TASK_STACK: usize = 64 * 1024;

/// Shared handles for everything external surfaces may touch.
pub struct CoreContext<A: AdcRead, D: OutputDrive> {
    /// Latest reading per sensor.
    pub store: Arc<SharedStateStore>,
    /// Per-sensor readiness bits.
    pub barrier: Arc<ReadinessBarrier>,
    /// Sampling sources and their calibration.
    pub sensors: Arc<SensorBank<A>>,
    /// Lamp outputs.
    pub actuators: Arc<ActuatorBank<D>>,
    /// Recent traffic seen by the streaming consumer.
    pub recent: RecentReadings,
    /// Distribution queue health counters.
    pub queue_stats: Arc<QueueStats>,
}

/// The running coordination core.
pub struct Controller<A: AdcRead, D: OutputDrive> {
    context: CoreContext<A, D>,
    shutdown: Arc<Shutdown>,
    tasks: Vec<JoinHandle<()>>,
    blink_timer: PeriodicTimer,
}

impl<A: AdcRead + 'static, D: OutputDrive + 'static> Controller<A, D> {
    /// Build the context and spawn all tasks.
    pub fn start(
        config: ControllerConfig,
        adc: A,
        drive: D,
        clock: Arc<dyn Clock>,
    ) -> io::Result<Self> {
        log::info!("starting controller");

        let shutdown = Arc::new(Shutdown::new());
        let store = Arc::new(SharedStateStore::new(config.lock_timeout));
        let barrier = Arc::new(ReadinessBarrier::new());
        let sensors = Arc::new(SensorBank::new(adc, config.lock_timeout));
        let actuators = Arc::new(ActuatorBank::new(drive, config.lock_timeout));

        let (queue_tx, queue_rx) = reading_queue(config.queue_capacity);
        let queue_stats = queue_tx.stats_handle();

        let consumer = StreamConsumer::new(queue_rx);
        let recent = consumer.recent();

        let sampler = Sampler::new(
            Arc::clone(&sensors),
            queue_tx,
            Arc::clone(&store),
            Arc::clone(&barrier),
            clock,
            SamplerTiming {
                period: config.sample_period,
                queue_timeout: config.queue_timeout,
            },
        );

        let mut aggregator = Aggregator::new(
            Arc::clone(&barrier),
            Arc::clone(&store),
            LogSink,
            config.barrier_timeout,
            config.summary_window,
        );

        let mut tasks = Vec::with_capacity(3);
        tasks.push(spawn_task("sampler", {
            let shutdown = Arc::clone(&shutdown);
            move || sampler.run(&shutdown)
        })?);
        tasks.push(spawn_task("streamer", move || consumer.run())?);
        tasks.push(spawn_task("aggregator", {
            let shutdown = Arc::clone(&shutdown);
            move || aggregator.run(&shutdown)
        })?);

        let blink = AdaptiveBlink::new(
            Arc::clone(&actuators),
            Arc::clone(&store),
            BlinkPolicy {
                hysteresis: config.hysteresis,
                default_period: config.blink_period,
                fast_period: config.blink_fast_period,
                watched: config.watched_sensor,
            },
        );
        let blink_timer =
            PeriodicTimer::spawn("blink", config.blink_period, Arc::clone(&shutdown), blink)?;

        log::info!("all tasks running");

        Ok(Self {
            context: CoreContext { store, barrier, sensors, actuators, recent, queue_stats },
            shutdown,
            tasks,
            blink_timer,
        })
    }

    /// Handles for external surfaces.
    pub fn context(&self) -> &CoreContext<A, D> {
        &self.context
    }

    /// Stop every task and wait for the threads to exit.
    pub fn shutdown(self) {
        log::info!("shutting down");
        self.shutdown.trigger();
        for task in self.tasks {
            let name = task.thread().name().unwrap_or("task").to_owned();
            if task.join().is_err() {
                log::error!("{name} thread panicked");
            }
        }
        self.blink_timer.join();
        log::info!("controller stopped");
    }
}

fn spawn_task(
    name: &str,
    body: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(name.to_owned())
        .stack_size(TASK_STACK)
        .spawn(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::SimulatedDrive;
    use crate::reading::SensorId;
    use crate::sensor::SimulatedAdc;
    use crate::time::MonotonicClock;
    use std::time::Duration;

    #[test]
    fn controller_runs_and_shuts_down_cleanly() {
        let config = ControllerConfig {
            sample_period: Duration::from_millis(5),
            barrier_timeout: Duration::from_millis(50),
            blink_period: Duration::from_millis(5),
            blink_fast_period: Duration::from_millis(2),
            ..ControllerConfig::default()
        };

        let adc = SimulatedAdc::new()
            .script(SensorId::Light, &[100, 200, 300])
            .script(SensorId::Water, &[10, 20, 30]);

        let controller =
            Controller::start(config, adc, SimulatedDrive::new(), Arc::new(MonotonicClock::new()))
                .unwrap();

        // Let a few cycles land.
        std::thread::sleep(Duration::from_millis(50));

        let context = controller.context();
        assert!(context.store.read(SensorId::Light).unwrap().is_some());
        assert!(context.recent.latest().is_some());

        controller.shutdown();
    }
}
