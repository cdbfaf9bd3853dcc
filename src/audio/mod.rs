//! Audio engine — cpal output stream fed by a lock-free command queue.
//!
//! The engine owns the cpal output stream and talks to it through a ring
//! buffer. The playback thread pushes [`AudioCommand`]s; the audio thread drains
//! them in its callback and mixes the resulting voices.

pub mod callback;
pub mod command;
pub mod sink;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::{
    traits::{Producer, Split},
    HeapRb,
};
use tracing::{error, info};

pub use callback::{Voice, MASTER_CEILING, MAX_VOICES};
pub use command::AudioCommand;
pub use sink::{AudioSink, VoiceSender};

use callback::AudioCallback;

/// Ring buffer capacity (number of commands).
const RING_BUFFER_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoOutputDevice,
    #[error("device config error: {0}")]
    DeviceConfig(String),
    #[error("stream build error: {0}")]
    StreamBuild(String),
    #[error("stream play error: {0}")]
    StreamPlay(String),
    /// The audio thread is not draining fast enough.
    #[error("audio command ring buffer is full")]
    BufferFull,
}

/// Owns the cpal stream and the producer half of the command queue.
pub struct AudioEngine {
    /// Dropping the stream closes the device.
    _stream: cpal::Stream,
    producer: ringbuf::HeapProd<AudioCommand>,
    sample_rate: u32,
    channels: u16,
}

impl AudioEngine {
    /// Create and start the engine on the default output device at its default config.
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;

        Self::build_with_device(&device, config.sample_rate().0, config.channels())
    }

    fn build_with_device(
        device: &cpal::Device,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self, AudioError> {
        let rb = HeapRb::<AudioCommand>::new(RING_BUFFER_CAPACITY);
        let (producer, consumer) = rb.split();

        let mut audio_callback = AudioCallback::new(consumer, channels);

        let stream_config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    audio_callback.process(data);
                },
                |err: cpal::StreamError| error!(%err, "audio stream error"),
                None,
            )
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlay(e.to_string()))?;

        info!(sample_rate, channels, "audio engine started");
        Ok(Self {
            _stream: stream,
            producer,
            sample_rate,
            channels,
        })
    }

    /// Queue a voice to start on the next audio callback.
    pub fn trigger(&mut self, voice: Voice) -> Result<(), AudioError> {
        self.producer
            .try_push(AudioCommand::Trigger(voice))
            .map_err(|_| AudioError::BufferFull)
    }

    /// Cut every sounding voice.
    pub fn stop(&mut self) -> Result<(), AudioError> {
        self.producer
            .try_push(AudioCommand::Stop)
            .map_err(|_| AudioError::BufferFull)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl VoiceSender for AudioEngine {
    fn send(&mut self, voice: Voice) -> Result<(), AudioError> {
        self.trigger(voice)
    }

    fn silence(&mut self) -> Result<(), AudioError> {
        self.stop()
    }
}
