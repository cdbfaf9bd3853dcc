//! Commands sent from the scheduler thread to the audio thread via ring buffer.

use super::callback::Voice;

#[derive(Debug)]
pub enum AudioCommand {
    /// Start a voice on the next callback.
    Trigger(Voice),

    /// Silence every sounding voice.
    Stop,
}
