//! Real-time playback scheduler — fires a millisecond timeline against a wall clock.
//!
//! Each pass records one start instant and waits for every event group against
//! `start + offset`, re-reading the clock on every polling slice. Wake-up error
//! therefore stays bounded per event instead of accumulating across the pass.
//!
//! The scheduler does **not** own an audio device; firing goes through the
//! [`Trigger`] seam so timing logic is testable with a [`ManualClock`].

pub mod clock;
pub mod trigger;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::event::Timeline;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use trigger::{Fired, Hit, Trigger};

/// Default polling slice: the scheduler never sleeps longer than this at once.
pub const DEFAULT_POLL_SLICE: Duration = Duration::from_millis(1);

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    /// Waiting for the next event group.
    Scheduled,
    /// Dispatching one event group.
    Firing,
}

/// How many passes over the timeline to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Once,
    Times(u32),
    /// Until the stop handle fires.
    Forever,
}

impl Repeat {
    fn allows(self, completed: u32) -> bool {
        match self {
            Repeat::Once => completed < 1,
            Repeat::Times(n) => completed < n,
            Repeat::Forever => true,
        }
    }
}

/// Cooperative stop signal shared with the outside world (e.g. a Ctrl-C handler).
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Summary of one [`PlaybackScheduler::run`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackReport {
    /// Passes played to completion.
    pub passes: u32,
    pub fired: usize,
    /// Hits skipped because no sound was bound to their note.
    pub missing: usize,
    pub dropped: usize,
    /// Worst gap between an event group's target instant and its dispatch.
    pub max_lateness: Duration,
    pub stopped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassEnd {
    Completed,
    Stopped,
}

/// Drives a [`Trigger`] from a millisecond [`Timeline`].
pub struct PlaybackScheduler<C: Clock = MonotonicClock> {
    clock: C,
    poll_slice: Duration,
    stop: StopHandle,
    state: PlaybackState,
}

impl<C: Clock> PlaybackScheduler<C> {
    /// `poll_slice` bounds both wake-up error and stop latency.
    pub fn new(clock: C, poll_slice: Duration, stop: StopHandle) -> Self {
        Self {
            clock,
            poll_slice: poll_slice.max(Duration::from_micros(1)),
            stop,
            state: PlaybackState::Idle,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn poll_slice(&self) -> Duration {
        self.poll_slice
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Play `timeline` through `trigger`, blocking until the passes finish or
    /// the stop handle fires. Each pass lasts the timeline's span and starts
    /// from a fresh clock reading.
    pub fn run<T: Trigger + ?Sized>(
        &mut self,
        timeline: &Timeline<f64>,
        trigger: &mut T,
        repeat: Repeat,
    ) -> PlaybackReport {
        let mut report = PlaybackReport::default();
        info!(
            events = timeline.len(),
            span_ms = timeline.span(),
            ?repeat,
            "playback started"
        );

        while repeat.allows(report.passes) {
            if self.run_pass(timeline, trigger, &mut report) == PassEnd::Stopped {
                report.stopped = true;
                break;
            }
            report.passes += 1;
            // A pass with nothing to fire and no length would spin.
            if timeline.is_empty() && timeline.span() <= 0.0 {
                break;
            }
        }

        trigger.finish();
        self.state = PlaybackState::Idle;
        info!(
            passes = report.passes,
            fired = report.fired,
            missing = report.missing,
            stopped = report.stopped,
            max_lateness_us = report.max_lateness.as_micros() as u64,
            "playback finished"
        );
        report
    }

    fn run_pass<T: Trigger + ?Sized>(
        &mut self,
        timeline: &Timeline<f64>,
        trigger: &mut T,
        report: &mut PlaybackReport,
    ) -> PassEnd {
        let start = self.clock.now();
        self.state = PlaybackState::Scheduled;

        for group in timeline.groups() {
            let target = start + millis(group[0].offset);
            if !self.wait_until(target) {
                return PassEnd::Stopped;
            }

            let lateness = self.clock.now().saturating_sub(target);
            report.max_lateness = report.max_lateness.max(lateness);
            if lateness > self.poll_slice * 2 {
                warn!(
                    offset_ms = group[0].offset,
                    late_us = lateness.as_micros() as u64,
                    "event group fired late"
                );
            }

            self.state = PlaybackState::Firing;
            for event in group {
                match trigger.fire(&Hit::from(event)) {
                    Fired::Played => report.fired += 1,
                    Fired::Missing => report.missing += 1,
                    Fired::Dropped => report.dropped += 1,
                }
            }
            self.state = PlaybackState::Scheduled;
        }

        if !self.wait_until(start + millis(timeline.span())) {
            return PassEnd::Stopped;
        }
        PassEnd::Completed
    }

    /// Poll until the clock reaches `target`. Returns `false` if stopped first.
    fn wait_until(&self, target: Duration) -> bool {
        loop {
            if self.stop.is_stopped() {
                return false;
            }
            let now = self.clock.now();
            if now >= target {
                return true;
            }
            self.clock.sleep((target - now).min(self.poll_slice));
        }
    }
}

fn millis(ms: f64) -> Duration {
    Duration::from_secs_f64(ms.max(0.0) / 1000.0)
}
