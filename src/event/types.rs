//! Compiled event — one hit placed at an absolute offset.

use super::time_base::Offset;

/// A single hit at an absolute offset from the start of the timeline.
///
/// `O` is `u64` for MIDI ticks or `f64` for milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompiledEvent<O: Offset> {
    pub offset: O,
    pub note: u8,
    /// 0–127.
    pub velocity: u8,
    /// Canonical pan, 0–127 with 64 = center.
    pub pan: u8,
    /// 1-based MIDI channel of the owning pattern.
    pub channel: u8,
    /// Declaration index of the owning pattern.
    pub pattern: usize,
    /// Step length of the owning pattern's grid.
    pub step: O,
}
