//! Timeline compiler — maps pattern grids onto absolute time.
//!
//! The same [`Composition`](crate::model::Composition) compiles against either
//! time base: [`Ticks`] for the MIDI file backend or [`Millis`] for the live
//! playback scheduler. Both consumers receive one merged, time-ordered
//! [`Timeline`].

pub mod compile;
pub mod time_base;
pub mod timeline;
pub mod types;

pub use compile::{compile, compile_pattern};
pub use time_base::{
    Millis, Offset, Ticks, TimeBase, BEATS_PER_WHOLE_NOTE, DEFAULT_PPQN, MAX_PPQN,
};
pub use timeline::{Groups, Timeline};
pub use types::CompiledEvent;
