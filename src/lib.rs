//! Gran Cassa — drum-pattern compiler and player.
//!
//! Step-sequenced patterns compile to a merged event timeline, which is either
//! written as a Standard MIDI File or fired live against a wall clock.

pub mod audio;
pub mod config;
pub mod error;
pub mod event;
pub mod instrument;
pub mod midi;
pub mod model;
pub mod playback;
pub mod versioning;

pub use error::{Error, Result};
