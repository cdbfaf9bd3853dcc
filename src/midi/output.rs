//! Live MIDI output — sends fired hits to a hardware or virtual MIDI port.

use std::collections::BTreeSet;

use midir::{MidiOutput, MidiOutputConnection};
use midly::live::LiveEvent;
use midly::num::{u4, u7};
use midly::MidiMessage;
use tracing::{debug, info};

use super::smf::PAN_CONTROLLER;
use crate::error::{Error, Result};
use crate::playback::{Fired, Hit, Trigger};

/// Raw byte sink for encoded MIDI messages.
pub trait MidiPort {
    fn send(&mut self, message: &[u8]) -> std::result::Result<(), String>;
}

impl MidiPort for MidiOutputConnection {
    fn send(&mut self, message: &[u8]) -> std::result::Result<(), String> {
        MidiOutputConnection::send(self, message).map_err(|e| e.to_string())
    }
}

/// Sends pan + note-on per hit and keeps note-offs balanced.
///
/// A note still sounding on its channel is released before it is struck
/// again, and everything left sounding is released on [`Trigger::finish`].
pub struct MidiOutSink<P: MidiPort> {
    port: P,
    port_name: String,
    sounding: BTreeSet<(u8, u8)>,
}

impl MidiOutSink<MidiOutputConnection> {
    /// Connect to the first port whose name contains `device`, or the first
    /// port when no filter is given.
    pub fn connect(device: Option<&str>) -> Result<Self> {
        let midi_out = MidiOutput::new("gran-cassa")
            .map_err(|e| Error::MidiOutput(format!("init: {e}")))?;

        let ports = midi_out.ports();
        let found = ports.iter().find_map(|p| {
            let name = midi_out.port_name(p).unwrap_or_default();
            match device {
                Some(filter) if !name.contains(filter) => None,
                _ => Some((p.clone(), name)),
            }
        });
        let (port, port_name) = found.ok_or_else(|| match device {
            Some(filter) => Error::MidiOutput(format!("no output port matching '{filter}'")),
            None => Error::MidiOutput("no MIDI output ports available".into()),
        })?;

        let connection = midi_out
            .connect(&port, "gran-cassa-out")
            .map_err(|e| Error::MidiOutput(format!("connect: {e}")))?;

        info!(port = %port_name, "connected MIDI output");
        Ok(Self::new(connection, port_name))
    }
}

impl<P: MidiPort> MidiOutSink<P> {
    pub fn new(port: P, port_name: impl Into<String>) -> Self {
        Self {
            port,
            port_name: port_name.into(),
            sounding: BTreeSet::new(),
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn into_port(self) -> P {
        self.port
    }

    fn send(&mut self, channel: u8, message: MidiMessage) -> std::result::Result<(), String> {
        let event = LiveEvent::Midi {
            channel: u4::new(channel.saturating_sub(1)),
            message,
        };
        let mut bytes = Vec::with_capacity(3);
        event.write_std(&mut bytes).map_err(|e| e.to_string())?;
        self.port.send(&bytes)
    }

    fn strike(&mut self, hit: &Hit) -> std::result::Result<(), String> {
        if self.sounding.contains(&(hit.channel, hit.note)) {
            self.release(hit.channel, hit.note)?;
        }
        self.send(
            hit.channel,
            MidiMessage::Controller {
                controller: u7::new(PAN_CONTROLLER),
                value: u7::new(hit.pan),
            },
        )?;
        self.send(
            hit.channel,
            MidiMessage::NoteOn {
                key: u7::new(hit.note),
                vel: u7::new(hit.velocity),
            },
        )
    }

    fn release(&mut self, channel: u8, note: u8) -> std::result::Result<(), String> {
        self.sounding.remove(&(channel, note));
        self.send(
            channel,
            MidiMessage::NoteOff {
                key: u7::new(note),
                vel: u7::new(0),
            },
        )
    }
}

impl<P: MidiPort> Trigger for MidiOutSink<P> {
    fn fire(&mut self, hit: &Hit) -> Fired {
        match self.strike(hit) {
            Ok(()) => {
                if hit.velocity > 0 {
                    self.sounding.insert((hit.channel, hit.note));
                }
                Fired::Played
            }
            Err(err) => {
                debug!(note = hit.note, channel = hit.channel, %err, "MIDI send failed");
                Fired::Dropped
            }
        }
    }

    fn finish(&mut self) {
        let held: Vec<(u8, u8)> = self.sounding.iter().copied().collect();
        for (channel, note) in held {
            if let Err(err) = self.release(channel, note) {
                debug!(note, channel, %err, "note-off failed");
            }
        }
    }
}
