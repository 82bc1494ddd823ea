//! Zero-cost timing instrumentation for the tracer.
//!
//! With the `timing` feature the timer measures wall-clock phase durations;
//! without it every measurement is `Duration::ZERO` and compiles away.
//!
//! Usage:
//!   cargo run --release --features timing --bin bench-trace

use std::time::Duration;

#[cfg(feature = "timing")]
pub(crate) struct Timer(std::time::Instant);

#[cfg(feature = "timing")]
impl Timer {
    #[inline]
    pub fn start() -> Self {
        Self(std::time::Instant::now())
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}

/// Dummy timer when `timing` is disabled (zero-sized).
#[cfg(not(feature = "timing"))]
pub(crate) struct Timer;

#[cfg(not(feature = "timing"))]
impl Timer {
    #[inline(always)]
    pub fn start() -> Self {
        Self
    }

    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        Duration::ZERO
    }
}

/// Accumulated phase durations of one trace. All zero unless built with `timing`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceTimings {
    /// Initial component search at the latest threshold.
    pub seed: Duration,
    /// Restriction and component search over all lineages.
    pub resolve: Duration,
    /// Snapshot reads/writes and result appends.
    pub store: Duration,
}

impl TraceTimings {
    #[inline]
    pub fn total(&self) -> Duration {
        self.seed + self.resolve + self.store
    }
}
