//! Error Types for the Coordination Core
//!
//! Every failure in this crate is local and recoverable. The contract for all
//! task loops is "skip and continue at the next period": a sensor that cannot
//! be read is skipped for one cycle, a contended lock drops one update, a full
//! queue drops one reading. Nothing here ever escalates to process
//! termination, and no call site retries automatically.
//!
//! Errors are kept small and `Copy` so they can be returned from hot paths
//! without allocation. Context is inline (`&'static str` resource names,
//! numeric ids), never heap-allocated strings.

use thiserror_no_std::Error;

/// Result alias used throughout the crate.
pub type ControlResult<T> = Result<T, ControlError>;

/// Recoverable failures raised by the coordination core.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    /// The underlying ADC could not produce a sample for this channel.
    ///
    /// The sampler skips the sensor for the current cycle. There is no retry
    /// within the cycle.
    #[error("hardware read failed on channel {channel}")]
    HardwareRead {
        /// ADC channel that failed.
        channel: u8,
    },

    /// A bounded-wait lock acquisition timed out.
    ///
    /// The update or read protected by the lock is dropped; the caller logs a
    /// warning and carries on.
    #[error("lock on {resource} not acquired within {waited_ms} ms")]
    LockTimeout {
        /// Name of the contended resource.
        resource: &'static str,
        /// How long the caller was willing to wait.
        waited_ms: u64,
    },

    /// The distribution queue was full for the whole send timeout.
    ///
    /// Backpressure-by-drop: the reading is discarded and counted, the
    /// sampler keeps its period rather than stalling for a slow consumer.
    #[error("distribution queue full, reading dropped")]
    QueueFull,

    /// An out-of-range identifier was passed in from an external surface.
    ///
    /// Rejected immediately, no state change. Internal code uses exhaustive
    /// enums and cannot produce this.
    #[error("invalid id {index} (valid range 0..{count})")]
    InvalidId {
        /// The offending index.
        index: usize,
        /// Number of valid identifiers.
        count: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_small_and_copy() {
        // Returned in hot paths; keep them register-sized-ish.
        assert!(core::mem::size_of::<ControlError>() <= 32);
        let e = ControlError::QueueFull;
        let _copied = e;
        let _still_usable = e;
    }

    #[test]
    fn display_carries_context() {
        let e = ControlError::LockTimeout { resource: "shared_state", waited_ms: 100 };
        let msg = format!("{e}");
        assert!(msg.contains("shared_state"));
        assert!(msg.contains("100"));
    }
}
