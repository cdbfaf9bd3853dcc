//! Error taxonomy shared by the model, compiler, and output backends.

use std::fmt;
use std::path::PathBuf;

/// Identifies a pattern inside a composition by position and label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternRef {
    pub index: usize,
    pub name: String,
}

impl PatternRef {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }
}

impl fmt::Display for PatternRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "#{}", self.index)
        } else {
            write!(f, "#{} '{}'", self.index, self.name)
        }
    }
}

/// A specific invariant broken by a pattern or the song config.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Violation {
    #[error("hits has {hits} entries but divisions is {divisions}")]
    HitsLength { hits: usize, divisions: u32 },
    #[error("hit {index} is {value}, expected 0 or 1")]
    HitFlag { index: usize, value: i32 },
    #[error("{hits} hits but {velocities} velocities")]
    VelocityCount { hits: usize, velocities: usize },
    #[error("{hits} hits but {panning} pan values")]
    PanCount { hits: usize, panning: usize },
    #[error("velocity {value} at hit {index} is outside 0-127")]
    VelocityRange { index: usize, value: i32 },
    #[error("pan {value} at hit {index} is outside 0-127")]
    PanOutOfRange { index: usize, value: i32 },
    #[error("channel {0} is outside 1-16")]
    Channel(i32),
    #[error("note {0} is outside 0-127")]
    Note(i32),
    #[error("bpm {0} is outside 1-999")]
    Bpm(u32),
    #[error("time signature {0}/{1} must use positive numbers")]
    TimeSignature(u32, u32),
    #[error("swing amount {0} is outside 0.0-1.0")]
    Swing(f64),
}

/// Grid configuration problems: the divisions cannot be spread over the bars.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("bars must be at least 1, got {0}")]
    NoBars(u32),
    #[error("divisions {divisions} is smaller than bars {bars}")]
    TooFewDivisions { divisions: u32, bars: u32 },
    #[error("divisions {divisions} does not divide evenly into {bars} bars")]
    UnevenDivision { divisions: u32, bars: u32 },
}

/// A pan value that fits neither the [-64,64] nor the [-100,100] convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("pan value {0} is outside both [-64,64] and [-100,100]")]
pub struct PanRangeError(pub i32);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("pattern {pattern}: {violation}")]
    Validation {
        pattern: PatternRef,
        violation: Violation,
    },

    #[error("song config: {0}")]
    SongConfig(Violation),

    #[error("pattern {pattern}: {violation}")]
    Configuration {
        pattern: PatternRef,
        violation: GridError,
    },

    #[error("pattern {pattern}: {source}")]
    PanRange {
        pattern: PatternRef,
        source: PanRangeError,
    },

    #[error("failed to write MIDI file {}: {source}", path.display())]
    SerializationIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid composition document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("sound bank: {0}")]
    SoundBank(String),

    #[error("audio: {0}")]
    Audio(#[from] crate::audio::AudioError),

    #[error("MIDI output: {0}")]
    MidiOutput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
