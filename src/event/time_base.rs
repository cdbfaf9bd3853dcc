//! Time bases the compiler can target: integer MIDI ticks or wall-clock milliseconds.
//!
//! Both measure a bar as one whole note (four quarter-note beats) regardless of
//! the song's meter. A triplet step is two thirds of the straight step for the
//! same grid.

use std::fmt;

use crate::model::SongConfig;

/// Quarter-note beats in one whole note.
pub const BEATS_PER_WHOLE_NOTE: u32 = 4;

/// Default file resolution, in pulses per quarter note.
pub const DEFAULT_PPQN: u16 = 480;

/// Highest PPQN a metrical SMF header can carry.
pub const MAX_PPQN: u16 = 0x7FFF;

/// Offsets within one instant of each other are treated as simultaneous.
pub trait Offset: Copy + PartialOrd + fmt::Debug {
    const ZERO: Self;

    fn coincides(self, other: Self) -> bool;
}

impl Offset for u64 {
    const ZERO: Self = 0;

    fn coincides(self, other: Self) -> bool {
        self == other
    }
}

/// Millisecond offsets closer than this are one instant.
const MS_EPSILON: f64 = 1e-6;

impl Offset for f64 {
    const ZERO: Self = 0.0;

    fn coincides(self, other: Self) -> bool {
        (self - other).abs() < MS_EPSILON
    }
}

/// Maps a grid position to an absolute offset from the start of the timeline.
pub trait TimeBase {
    type Offset: Offset;

    /// Length of one step in a grid of `steps_per_bar` steps.
    fn step_length(&self, steps_per_bar: u32, triplet: bool) -> Self::Offset;

    /// Offset of grid step `index`.
    fn offset(&self, index: u32, steps_per_bar: u32, triplet: bool) -> Self::Offset;
}

/// Integer ticks at a fixed PPQN, for file output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticks {
    ppqn: u16,
}

impl Ticks {
    /// PPQN is clamped to `1..=MAX_PPQN`.
    pub fn new(ppqn: u16) -> Self {
        Self {
            ppqn: ppqn.clamp(1, MAX_PPQN),
        }
    }

    pub fn ppqn(self) -> u16 {
        self.ppqn
    }

    pub fn whole_note(self) -> u64 {
        u64::from(self.ppqn) * u64::from(BEATS_PER_WHOLE_NOTE)
    }
}

impl Default for Ticks {
    fn default() -> Self {
        Self::new(DEFAULT_PPQN)
    }
}

impl TimeBase for Ticks {
    type Offset = u64;

    /// Truncating integer math: the straight step is floored first, then the
    /// triplet factor is applied and floored again.
    fn step_length(&self, steps_per_bar: u32, triplet: bool) -> u64 {
        let straight = self.whole_note() / u64::from(steps_per_bar.max(1));
        if triplet {
            straight * 2 / 3
        } else {
            straight
        }
    }

    fn offset(&self, index: u32, steps_per_bar: u32, triplet: bool) -> u64 {
        u64::from(index) * self.step_length(steps_per_bar, triplet)
    }
}

/// Wall-clock milliseconds at a fixed tempo, for live playback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Millis {
    bpm: u32,
}

impl Millis {
    pub fn new(bpm: u32) -> Self {
        Self { bpm: bpm.max(1) }
    }

    pub fn bpm(self) -> u32 {
        self.bpm
    }

    pub fn whole_note(self) -> f64 {
        60_000.0 / f64::from(self.bpm) * f64::from(BEATS_PER_WHOLE_NOTE)
    }
}

impl From<&SongConfig> for Millis {
    fn from(config: &SongConfig) -> Self {
        Self::new(config.bpm)
    }
}

impl TimeBase for Millis {
    type Offset = f64;

    fn step_length(&self, steps_per_bar: u32, triplet: bool) -> f64 {
        self.offset(1, steps_per_bar, triplet)
    }

    // Scaling before dividing keeps offsets that land on the same instant in
    // different grids bit-identical more often.
    fn offset(&self, index: u32, steps_per_bar: u32, triplet: bool) -> f64 {
        let steps = f64::from(steps_per_bar.max(1));
        let span = f64::from(index) * self.whole_note();
        if triplet {
            span * 2.0 / (3.0 * steps)
        } else {
            span / steps
        }
    }
}
