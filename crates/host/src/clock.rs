//! Millisecond time source used for frame pacing and save cadence

use std::time::{Duration, Instant};

/// A monotonic millisecond clock that can block
pub trait Clock {
    /// Milliseconds since the clock was created
    fn now_ms(&self) -> u64;

    /// Block for at least `ms` milliseconds
    fn sleep_ms(&mut self, ms: u64);
}

/// Wall-clock time backed by `Instant` and `thread::sleep`
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn sleep_ms(&mut self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

/// Simulated time. Sleeping advances the clock instantly, optionally
/// overshooting like a coarse OS timer would.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: u64,
    overshoot: Vec<u64>,
    sleeps: usize,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each sleep overshoots by the next value of `pattern`, cycling
    pub fn with_overshoot(pattern: Vec<u64>) -> Self {
        Self {
            overshoot: pattern,
            ..Self::default()
        }
    }

    /// Let time pass without sleeping, e.g. to model work
    pub fn advance(&mut self, ms: u64) {
        self.now += ms;
    }

    /// Number of sleeps performed
    pub fn sleeps(&self) -> usize {
        self.sleeps
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.now
    }

    fn sleep_ms(&mut self, ms: u64) {
        let extra = if self.overshoot.is_empty() {
            0
        } else {
            self.overshoot[self.sleeps % self.overshoot.len()]
        };
        self.sleeps += 1;
        self.now += ms + extra;
    }
}
