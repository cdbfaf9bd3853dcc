//! Clock sources for the playback scheduler.

use std::cell::Cell;
use std::thread;
use std::time::{Duration, Instant};

/// A monotonic time source the scheduler polls against.
pub trait Clock {
    /// Time elapsed since the clock's own fixed epoch.
    fn now(&self) -> Duration;

    /// Block the calling thread for roughly `duration`.
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// A clock that only moves when slept on.
///
/// Each sleep advances time by the requested duration plus a fixed
/// `oversleep`, which models a scheduler that always wakes late.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
    oversleep: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_oversleep(oversleep: Duration) -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            oversleep,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration + self.oversleep);
    }
}
