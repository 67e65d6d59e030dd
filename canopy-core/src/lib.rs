//! Concurrent sensor acquisition and coordination core for Canopy
//!
//! Samples two environmental sensors on a fixed period, fans readings out to
//! independent consumers, keeps a lock-guarded latest-state record, and
//! drives actuators whose pace adapts to that state.
//!
//! Data flow:
//!
//! ```text
//! sampler ──> distribution queue ──> streaming consumer
//!    │
//!    ├─────> shared state store ───> aggregation consumer
//!    │          │        (readiness barrier gates the read)
//!    │          └──────────────────> adaptive blink (timer context)
//!    └─────> readiness barrier bits
//! ```
//!
//! Every blocking wait except the streaming consumer's receive carries an
//! explicit timeout, and every timeout degrades to "log and continue at the
//! next period". Hardware sits behind the [`sensor::AdcRead`] and
//! [`actuator::OutputDrive`] seams; nothing in this crate touches a driver
//! directly.
//!
//! ```no_run
//! use std::sync::Arc;
//! use canopy_core::config::ControllerConfig;
//! use canopy_core::runtime::Controller;
//! use canopy_core::sensor::SimulatedAdc;
//! use canopy_core::actuator::SimulatedDrive;
//! use canopy_core::time::MonotonicClock;
//!
//! let controller = Controller::start(
//!     ControllerConfig::default(),
//!     SimulatedAdc::new(),
//!     SimulatedDrive::new(),
//!     Arc::new(MonotonicClock::new()),
//! )?;
//! // ... external surfaces use controller.context() ...
//! controller.shutdown();
//! # Ok::<(), std::io::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod actuator;
pub mod aggregate;
pub mod barrier;
pub mod config;
pub mod control;
pub mod errors;
pub mod queue;
pub mod reading;
pub mod runtime;
pub mod sampler;
pub mod sensor;
pub mod shutdown;
pub mod store;
pub mod stream;
pub mod time;
pub mod timer;

// Public API
pub use barrier::{ReadinessBarrier, SensorSet, WaitOutcome};
pub use config::ControllerConfig;
pub use errors::{ControlError, ControlResult};
pub use reading::{CalibrationPolicy, Reading, SensorId};
pub use runtime::{Controller, CoreContext};
pub use store::SharedStateStore;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
