//! Millisecond time source.
//!
//! Timestamps are `u32` milliseconds that wrap after ~49 days. Durations are
//! always computed with [`elapsed_ms`], which stays correct across the wrap.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// Milliseconds from `since` to `now`, tolerating wraparound.
pub fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Monotonic clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the intended wraparound.
        self.origin.elapsed().as_millis() as u32
    }
}

/// Clock advanced by hand. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u32>>,
}

impl ManualClock {
    pub fn new(start_ms: u32) -> Self {
        ManualClock {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_survives_wraparound() {
        assert_eq!(elapsed_ms(100, 40), 60);
        assert_eq!(elapsed_ms(5, u32::MAX - 4), 10);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(u32::MAX);
        let handle = clock.clone();
        handle.advance(2);
        assert_eq!(clock.now_ms(), 1);
        handle.set(500);
        assert_eq!(clock.now_ms(), 500);
    }
}
