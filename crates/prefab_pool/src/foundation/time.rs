//! Time management utilities
//!
//! Pools never read the wall clock directly. Every delay is measured against a
//! [`Clock`], which the host either lets run on its own ([`SystemClock`]) or
//! advances explicitly once per frame ([`ManualClock`]).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic time source in seconds
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time in seconds; never decreases between calls
    fn now(&self) -> f32;
}

/// Shared clock handle passed to pools
pub type SharedClock = Arc<dyn Clock>;

/// Clock backed by [`Instant`], counting seconds since creation
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    /// Create a new clock starting at zero
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }

    /// Create a shared handle to a new system clock
    pub fn shared() -> SharedClock {
        Arc::new(Self::new())
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f32 {
        self.origin.elapsed().as_secs_f32()
    }
}

/// Clock driven by the host loop
///
/// Time only moves when [`advance`](Self::advance) or [`set`](Self::set) is
/// called, which makes delayed destruction fully deterministic.
#[derive(Debug, Default)]
pub struct ManualClock {
    bits: AtomicU32,
}

impl ManualClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self::starting_at(0.0)
    }

    /// Create a clock at the given time
    pub fn starting_at(seconds: f32) -> Self {
        Self { bits: AtomicU32::new(seconds.max(0.0).to_bits()) }
    }

    /// Move time forward by `delta` seconds (negative deltas are ignored)
    pub fn advance(&self, delta: f32) -> f32 {
        let now = self.now() + delta.max(0.0);
        self.bits.store(now.to_bits(), Ordering::Release);
        now
    }

    /// Jump to an absolute time; going backwards is ignored
    pub fn set(&self, seconds: f32) {
        if seconds > self.now() {
            self.bits.store(seconds.to_bits(), Ordering::Release);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }
}
