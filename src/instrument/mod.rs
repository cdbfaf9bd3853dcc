//! Instruments — note-keyed sample banks and the synthetic fallback kit.
//!
//! A bank maps MIDI note numbers to decoded samples. It is built once before
//! playback and then shared read-only with the audio sink.

pub mod sample;
pub mod synth;

pub use sample::{SampleData, SampleError};
pub use synth::default_kit;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::error::{Error, Result};
use crate::model::MIDI_MAX;

/// Samples keyed by MIDI note.
#[derive(Debug, Clone, Default)]
pub struct SampleBank {
    samples: HashMap<u8, Arc<SampleData>>,
}

impl SampleBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a sound-bank file: a JSON object of `"note": "path/to.wav"`.
    ///
    /// Relative WAV paths resolve against the bank file's directory. Every
    /// sample is decoded and resampled to `sample_rate` up front.
    pub fn load(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::SoundBank(format!("{}: {e}", path.display())))?;
        let entries: BTreeMap<String, String> = serde_json::from_str(&text)
            .map_err(|e| Error::SoundBank(format!("{}: {e}", path.display())))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));

        let mut bank = Self::new();
        for (key, wav) in entries {
            let note = parse_note(&key)?;
            let wav_path = base.join(&wav);
            let data = SampleData::from_wav_file(&wav_path, sample_rate)
                .map_err(|e| Error::SoundBank(format!("note {note} ({}): {e}", wav_path.display())))?;
            bank.insert(note, data);
        }

        info!(path = %path.display(), sounds = bank.len(), "loaded sound bank");
        Ok(bank)
    }

    pub fn insert(&mut self, note: u8, data: SampleData) {
        self.samples.insert(note, Arc::new(data));
    }

    pub fn get(&self, note: u8) -> Option<&Arc<SampleData>> {
        self.samples.get(&note)
    }

    pub fn contains(&self, note: u8) -> bool {
        self.samples.contains_key(&note)
    }

    /// Bound notes in ascending order.
    pub fn notes(&self) -> Vec<u8> {
        let mut notes: Vec<u8> = self.samples.keys().copied().collect();
        notes.sort_unstable();
        notes
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

fn parse_note(key: &str) -> Result<u8> {
    key.trim()
        .parse::<u8>()
        .ok()
        .filter(|n| *n <= MIDI_MAX)
        .ok_or_else(|| Error::SoundBank(format!("'{key}' is not a MIDI note number")))
}
