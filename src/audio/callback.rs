//! Audio callback — runs on the cpal audio thread.
//!
//! Drains commands from the ring buffer, mixes every sounding voice into the
//! output, and applies a hard ceiling.

use std::sync::Arc;

use ringbuf::traits::Consumer;
use ringbuf::HeapCons;

use super::command::AudioCommand;
use crate::instrument::SampleData;

/// Voices sounding at once; the oldest is cut when a new one arrives past this.
pub const MAX_VOICES: usize = 64;

/// Output is hard-clamped to `[-MASTER_CEILING, MASTER_CEILING]`.
pub const MASTER_CEILING: f32 = 0.95;

/// One sounding sample with fixed per-side gains.
#[derive(Debug, Clone)]
pub struct Voice {
    sample: Arc<SampleData>,
    position: usize,
    left: f32,
    right: f32,
}

impl Voice {
    pub fn new(sample: Arc<SampleData>, left: f32, right: f32) -> Self {
        Self {
            sample,
            position: 0,
            left,
            right,
        }
    }

    pub fn sample(&self) -> &Arc<SampleData> {
        &self.sample
    }

    pub fn gains(&self) -> (f32, f32) {
        (self.left, self.right)
    }

    fn is_finished(&self) -> bool {
        self.position >= self.sample.len()
    }

    /// Next (left, right) frame, advancing the read position.
    #[inline]
    fn next_frame(&mut self) -> Option<(f32, f32)> {
        let s = *self.sample.samples().get(self.position)?;
        self.position += 1;
        Some((s * self.left, s * self.right))
    }
}

/// State that lives on the audio thread. Accessed only from the cpal callback.
pub struct AudioCallback {
    consumer: HeapCons<AudioCommand>,
    voices: Vec<Voice>,
    channels: u16,
}

impl AudioCallback {
    pub fn new(consumer: HeapCons<AudioCommand>, channels: u16) -> Self {
        Self {
            consumer,
            voices: Vec::with_capacity(MAX_VOICES),
            channels: channels.max(1),
        }
    }

    /// Fill one interleaved output buffer.
    pub fn process(&mut self, output: &mut [f32]) {
        while let Some(cmd) = self.consumer.try_pop() {
            match cmd {
                AudioCommand::Trigger(voice) => {
                    if self.voices.len() >= MAX_VOICES {
                        self.voices.remove(0);
                    }
                    self.voices.push(voice);
                }
                AudioCommand::Stop => self.voices.clear(),
            }
        }

        output.fill(0.0);
        let channels = usize::from(self.channels);

        for frame in output.chunks_mut(channels) {
            let (mut l, mut r) = (0.0f32, 0.0f32);
            for voice in &mut self.voices {
                if let Some((vl, vr)) = voice.next_frame() {
                    l += vl;
                    r += vr;
                }
            }
            match frame {
                [mono] => *mono = (l + r) * 0.5,
                [left, right, ..] => {
                    *left = l;
                    *right = r;
                }
                [] => {}
            }
        }

        for sample in output.iter_mut() {
            *sample = sample.clamp(-MASTER_CEILING, MASTER_CEILING);
        }

        self.voices.retain(|v| !v.is_finished());
    }

    /// Voices still sounding after the last callback.
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}
