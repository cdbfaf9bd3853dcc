//! Sample playback sink: turns fired hits into mixer voices.

use std::sync::Arc;

use ringbuf::traits::Producer;
use tracing::{debug, warn};

use super::callback::Voice;
use super::command::AudioCommand;
use super::AudioError;
use crate::instrument::SampleBank;
use crate::playback::{Fired, Hit, Trigger};

/// Anything that can hand a voice to the audio thread.
pub trait VoiceSender {
    fn send(&mut self, voice: Voice) -> Result<(), AudioError>;

    /// Cut every sounding voice.
    fn silence(&mut self) -> Result<(), AudioError>;
}

impl VoiceSender for ringbuf::HeapProd<AudioCommand> {
    fn send(&mut self, voice: Voice) -> Result<(), AudioError> {
        self.try_push(AudioCommand::Trigger(voice))
            .map_err(|_| AudioError::BufferFull)
    }

    fn silence(&mut self) -> Result<(), AudioError> {
        self.try_push(AudioCommand::Stop)
            .map_err(|_| AudioError::BufferFull)
    }
}

/// Plays the bank's sample for each hit's note, scaled by velocity and pan.
pub struct AudioSink<S: VoiceSender> {
    sender: S,
    bank: Arc<SampleBank>,
}

impl<S: VoiceSender> AudioSink<S> {
    pub fn new(sender: S, bank: Arc<SampleBank>) -> Self {
        Self { sender, bank }
    }

    pub fn bank(&self) -> &SampleBank {
        &self.bank
    }

    pub fn into_sender(self) -> S {
        self.sender
    }

    /// Cut voices still ringing, e.g. after an interrupted run.
    pub fn cut(&mut self) {
        if let Err(err) = self.sender.silence() {
            warn!(%err, "could not silence voices");
        }
    }
}

impl<S: VoiceSender> Trigger for AudioSink<S> {
    fn fire(&mut self, hit: &Hit) -> Fired {
        let Some(sample) = self.bank.get(hit.note) else {
            debug!(note = hit.note, channel = hit.channel, "no sample bound to note; hit skipped");
            return Fired::Missing;
        };

        let (left, right) = hit.stereo_gains();
        match self.sender.send(Voice::new(Arc::clone(sample), left, right)) {
            Ok(()) => Fired::Played,
            Err(err) => {
                debug!(note = hit.note, %err, "voice dropped");
                Fired::Dropped
            }
        }
    }
}
