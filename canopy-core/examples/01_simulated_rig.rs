//! Full controller on simulated hardware
//!
//! Spawns every task against a scripted ADC and an in-memory lamp drive,
//! lets a few summary windows complete, then shuts down cleanly.
//!
//! Run with:
//!
//! ```sh
//! RUST_LOG=info cargo run --example 01_simulated_rig
//! ```

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use canopy_core::actuator::SimulatedDrive;
use canopy_core::config::ControllerConfig;
use canopy_core::reading::{CalibrationPolicy, SensorId};
use canopy_core::runtime::Controller;
use canopy_core::sensor::SimulatedAdc;
use canopy_core::time::MonotonicClock;

fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Compressed timing so a full ten-window summary lands within seconds.
    let config = ControllerConfig {
        sample_period: Duration::from_millis(200),
        barrier_timeout: Duration::from_millis(500),
        blink_period: Duration::from_millis(100),
        blink_fast_period: Duration::from_millis(40),
        ..ControllerConfig::default()
    };

    // Light climbs through the hysteresis band and falls back, so the blink
    // period shortens mid-run and restores near the end. Water just drifts.
    let adc = SimulatedAdc::new()
        .script(SensorId::Light, &[5, 10, 20, 35, 50, 45, 25, 12, 8, 5])
        .script(
            SensorId::Water,
            &[1800, 1820, 1850, 1840, 1810, 1790, 1805, 1830, 1845, 1825],
        );

    let controller = Controller::start(
        config,
        adc,
        SimulatedDrive::new(),
        Arc::new(MonotonicClock::new()),
    )?;

    let context = controller.context();
    if let Err(err) = context.sensors.set_calibration(
        SensorId::Light,
        CalibrationPolicy::Linear { slope: 0.24, intercept: 0.0 },
        "lux",
    ) {
        log::warn!("calibration not applied: {err}");
    }

    // Ten samples at 200 ms; leave some slack for the summary to print.
    thread::sleep(Duration::from_secs(3));

    if let Some(latest) = context.recent.latest() {
        println!(
            "latest reading: {} raw={} calibrated={:.2} {}",
            latest.sensor.name(),
            latest.raw,
            latest.calibrated,
            latest.unit
        );
    }
    println!(
        "queue traffic: pushed={} popped={} dropped={}",
        context.queue_stats.pushed.load(Ordering::Relaxed),
        context.queue_stats.popped.load(Ordering::Relaxed),
        context.queue_stats.dropped.load(Ordering::Relaxed),
    );

    controller.shutdown();
    Ok(())
}
