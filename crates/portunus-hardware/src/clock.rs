//! Monotonic uptime clock.
//!
//! Event timestamps and debounce windows are measured from process start on
//! Tokio's clock, so tests running with a paused runtime see deterministic
//! time.

use tokio::time::Instant;

/// Process uptime measured from a fixed start instant.
#[derive(Debug, Clone, Copy)]
pub struct Uptime {
    start: Instant,
}

impl Uptime {
    /// Start counting from now.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Microseconds since start.
    pub fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Milliseconds since start, wrapping at `u32::MAX` like a hardware tick.
    pub fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

impl Default for Uptime {
    fn default() -> Self {
        Self::start()
    }
}
