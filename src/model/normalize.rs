//! Pan and velocity normalization into the canonical 0–127 range.
//!
//! Generator-style documents carry pan in one of two signed conventions and
//! never say which. The `[-64,64]` convention is tried first; a value outside
//! it but inside `[-100,100]` uses the wider mapping. Values in the overlap
//! always take the first mapping.

use crate::error::{PanRangeError, Violation};

/// Canonical pan center.
pub const PAN_CENTER: u8 = 64;

/// Highest canonical value for pan and velocity.
pub const MIDI_MAX: u8 = 127;

/// Map a legacy signed pan value to the canonical 0–127 range (64 = center).
pub fn normalize_pan(value: i32) -> Result<u8, PanRangeError> {
    let scaled = if (-64..=64).contains(&value) {
        f64::from(value + 64) * (127.0 / 128.0)
    } else if (-100..=100).contains(&value) {
        f64::from(value + 100) * (127.0 / 200.0)
    } else {
        return Err(PanRangeError(value));
    };
    Ok(scaled.round() as u8)
}

/// Bounds-check a velocity; values pass through unchanged.
pub fn check_velocity(index: usize, value: i32) -> Result<u8, Violation> {
    u8::try_from(value)
        .ok()
        .filter(|v| *v <= MIDI_MAX)
        .ok_or(Violation::VelocityRange { index, value })
}

/// Bounds-check a canonical pan value.
pub fn check_pan(index: usize, value: i32) -> Result<u8, Violation> {
    u8::try_from(value)
        .ok()
        .filter(|v| *v <= MIDI_MAX)
        .ok_or(Violation::PanOutOfRange { index, value })
}
