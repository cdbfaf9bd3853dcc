//! Standard MIDI File backend — compiled tick timeline to a format-0 file.
//!
//! Output is a pure function of the composition and PPQN: the same inputs
//! always produce byte-identical files.

use std::io::Write;
use std::path::Path;

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::event::{compile, Ticks, Timeline, DEFAULT_PPQN};
use crate::model::{Composition, SongConfig};

/// Controller number for channel pan.
pub const PAN_CONTROLLER: u8 = 10;

const MAX_TEMPO_MICROS: u32 = 0x00FF_FFFF;
const MAX_DELTA: u64 = 0x0FFF_FFFF;

/// Events at one tick are written in this order; ties keep timeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Slot {
    Meta,
    NoteOff,
    Controller,
    NoteOn,
}

struct Placed {
    tick: u64,
    slot: Slot,
    kind: TrackEventKind<'static>,
}

/// Writes compositions as single-track, tempo-tagged MIDI files.
#[derive(Debug, Clone, Copy)]
pub struct MidiWriter {
    ticks: Ticks,
}

impl MidiWriter {
    pub fn new(ppqn: u16) -> Self {
        Self {
            ticks: Ticks::new(ppqn),
        }
    }

    pub fn ppqn(&self) -> u16 {
        self.ticks.ppqn()
    }

    /// Compile and encode a composition without touching the filesystem.
    pub fn to_bytes(&self, composition: &Composition) -> Result<Vec<u8>> {
        let timeline = compile(composition, &self.ticks)?;
        self.encode(composition.config(), &timeline)
    }

    /// Encode an already-compiled tick timeline.
    pub fn encode(&self, config: &SongConfig, timeline: &Timeline<u64>) -> Result<Vec<u8>> {
        let mut placed = Vec::with_capacity(timeline.len() * 3 + 2);

        let micros = (60_000_000 / config.bpm.max(1)).min(MAX_TEMPO_MICROS);
        placed.push(Placed {
            tick: 0,
            slot: Slot::Meta,
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(micros))),
        });

        let (numerator, denominator) = config.time_signature;
        if denominator.is_power_of_two() {
            placed.push(Placed {
                tick: 0,
                slot: Slot::Meta,
                kind: TrackEventKind::Meta(MetaMessage::TimeSignature(
                    numerator.min(u32::from(u8::MAX)) as u8,
                    denominator.trailing_zeros() as u8,
                    24,
                    8,
                )),
            });
        } else {
            warn!(
                numerator,
                denominator, "time signature denominator is not a power of two; omitted from file"
            );
        }

        for event in timeline {
            let channel = u4::new(event.channel.saturating_sub(1));
            let key = u7::new(event.note);
            let duration = (event.step / 2).max(1);

            placed.push(Placed {
                tick: event.offset,
                slot: Slot::Controller,
                kind: TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::Controller {
                        controller: u7::new(PAN_CONTROLLER),
                        value: u7::new(event.pan),
                    },
                },
            });
            placed.push(Placed {
                tick: event.offset,
                slot: Slot::NoteOn,
                kind: TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOn {
                        key,
                        vel: u7::new(event.velocity),
                    },
                },
            });
            placed.push(Placed {
                tick: event.offset + duration,
                slot: Slot::NoteOff,
                kind: TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOff {
                        key,
                        vel: u7::new(0),
                    },
                },
            });
        }

        placed.sort_by_key(|p| (p.tick, p.slot));

        let mut track = Vec::with_capacity(placed.len() + 1);
        let mut last_tick = 0;
        for p in placed {
            let delta = (p.tick - last_tick).min(MAX_DELTA) as u32;
            last_tick = p.tick;
            track.push(TrackEvent {
                delta: u28::new(delta),
                kind: p.kind,
            });
        }
        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });

        let header = Header::new(
            Format::SingleTrack,
            Timing::Metrical(u15::new(self.ticks.ppqn())),
        );
        let mut smf = Smf::new(header);
        smf.tracks.push(track);

        let mut bytes = Vec::new();
        smf.write_std(&mut bytes)?;
        Ok(bytes)
    }

    /// Compile, encode, and atomically replace `path` with the result.
    ///
    /// The whole file is staged in a temporary file next to `path` and renamed
    /// over it, so a failed write never leaves a truncated file behind.
    pub fn write(&self, composition: &Composition, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes(composition)?;
        let io_err = |source| Error::SerializationIo {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        staged.write_all(&bytes).map_err(io_err)?;
        staged.as_file().sync_all().map_err(io_err)?;
        staged.persist(path).map_err(|e| io_err(e.error))?;

        info!(path = %path.display(), bytes = bytes.len(), "wrote MIDI file");
        Ok(())
    }
}

impl Default for MidiWriter {
    fn default() -> Self {
        Self::new(DEFAULT_PPQN)
    }
}
