//! MIDI backends — Standard MIDI File writer and live port output.

pub mod output;
pub mod smf;

pub use output::{MidiOutSink, MidiPort};
pub use smf::{MidiWriter, PAN_CONTROLLER};
