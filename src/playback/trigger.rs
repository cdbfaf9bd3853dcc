//! The firing seam between the scheduler and whatever makes sound.

use crate::event::{CompiledEvent, Offset};
use crate::model::{MIDI_MAX, PAN_CENTER};

/// One event as handed to a [`Trigger`] at its fire time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub note: u8,
    pub channel: u8,
    pub velocity: u8,
    pub pan: u8,
}

impl Hit {
    /// Linear gain, `velocity / 127`.
    pub fn gain(&self) -> f32 {
        f32::from(self.velocity) / f32::from(MIDI_MAX)
    }

    /// Stereo balance in `[-1, 1]`, `(pan - 64) / 64`.
    pub fn balance(&self) -> f32 {
        (f32::from(self.pan) - f32::from(PAN_CENTER)) / f32::from(PAN_CENTER)
    }

    /// Per-side gains: full gain on the favoured side, the other side attenuated.
    pub fn stereo_gains(&self) -> (f32, f32) {
        let gain = self.gain();
        let balance = self.balance();
        let left = gain * (1.0 - balance).clamp(0.0, 1.0);
        let right = gain * (1.0 + balance).clamp(0.0, 1.0);
        (left, right)
    }
}

impl<O: Offset> From<&CompiledEvent<O>> for Hit {
    fn from(event: &CompiledEvent<O>) -> Self {
        Self {
            note: event.note,
            channel: event.channel,
            velocity: event.velocity,
            pan: event.pan,
        }
    }
}

/// What happened when a hit was fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fired {
    Played,
    /// No sound is bound to the note; the hit was skipped.
    Missing,
    /// The sink could not deliver the hit (full queue, closed port).
    Dropped,
}

/// Makes sound for hits as the scheduler reaches them.
pub trait Trigger {
    fn fire(&mut self, hit: &Hit) -> Fired;

    /// Called once when a playback run ends, stopped or not.
    fn finish(&mut self) {}
}
