//! Player configuration — optional ~/.gran-cassa/config.yaml.
//!
//! Every field has a default, so a missing or partial file is fine. Command
//! line flags override whatever is loaded here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::event::DEFAULT_PPQN;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// MIDI file resolution.
    pub ppqn: u16,
    /// Longest single sleep of the playback scheduler, in microseconds.
    pub poll_slice_us: u64,
    /// Sound bank used by `play` when `--samples` is not given.
    pub sound_bank: Option<PathBuf>,
    /// Substring of the MIDI output port name for `play --midi`.
    pub midi_device: Option<String>,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Seed for the synthetic fallback kit.
    pub seed: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            ppqn: DEFAULT_PPQN,
            poll_slice_us: 1000,
            sound_bank: None,
            midi_device: None,
            log_level: "info".to_string(),
            seed: 42,
        }
    }
}

/// A config file that exists but does not parse. Callers fall back to
/// defaults and report it once logging is up.
#[derive(Debug, thiserror::Error)]
#[error("malformed config {}: {source}", path.display())]
pub struct MalformedConfig {
    pub path: PathBuf,
    #[source]
    pub source: serde_yaml::Error,
}

impl PlayerConfig {
    /// `~/.gran-cassa/config.yaml`, if a home directory exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".gran-cassa").join("config.yaml"))
    }

    /// Load from the default path. An absent file gives defaults; a
    /// malformed one gives defaults plus the parse error.
    pub fn load() -> (Self, Option<MalformedConfig>) {
        match Self::default_path().map(|p| Self::load_from(&p)) {
            Some(Ok(Some(config))) => (config, None),
            Some(Err(err)) => (Self::default(), Some(err)),
            _ => (Self::default(), None),
        }
    }

    /// `Ok(None)` when the file is absent or unreadable.
    pub fn load_from(path: &Path) -> Result<Option<Self>, MalformedConfig> {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Ok(None);
        };
        serde_yaml::from_str(&content)
            .map(Some)
            .map_err(|source| MalformedConfig {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn poll_slice(&self) -> Duration {
        Duration::from_micros(self.poll_slice_us.max(1))
    }
}
