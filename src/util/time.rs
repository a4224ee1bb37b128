//! Time utilities for the client tick loop

use std::time::{Duration, Instant};

/// Tick rate configuration
pub const DEFAULT_FPS: u32 = 30; // 30 simulation ticks per second
pub const DEFAULT_MAX_TICKS_PER_INVOCATION: u32 = 10;
pub const DEFAULT_SCHEDULER_INTERVAL_MS: u64 = 1;

/// Must exceed the OS auto-repeat delay (commonly 250-660ms), or a held key
/// is released and pressed again before its first repeat arrives
pub const DEFAULT_KEY_HOLD_MS: u64 = 500;

/// Length of one simulation tick at the given rate
pub fn tick_interval(fps: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(fps.max(1)))
}

/// A simple timer for measuring durations
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_micros(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
