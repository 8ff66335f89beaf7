//! MIDI event types and classification
//!
//! Turns raw status/data triples from the surface into typed events and
//! fans them out to every subscriber through the event bus.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::bus::EventBus;

/// Status bytes recognized on the SparkLE input port (channel 1 only)
pub mod status {
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const AFTERTOUCH: u8 = 0xA0;
    pub const CONTROL_CHANGE: u8 = 0xB0;
}

/// Classified MIDI event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    /// Note On: note (0-127), velocity (0-127)
    NoteOn { note: u8, velocity: u8 },

    /// Note Off: note (0-127), release velocity (0-127)
    NoteOff { note: u8, velocity: u8 },

    /// Control Change: controller (0-127), value (0-127)
    ControlChange { controller: u8, value: u8 },
}

impl MidiEvent {
    /// Classify a raw `(status, data1, data2)` triple
    ///
    /// Only exact channel-1 Note On, Note Off and Control Change status
    /// bytes are recognized. Everything else (aftertouch, other channels,
    /// system messages) yields `None`.
    pub fn classify(status: u8, data1: u8, data2: u8) -> Option<Self> {
        let data1 = data1 & 0x7F;
        let data2 = data2 & 0x7F;

        match status {
            status::NOTE_ON => Some(MidiEvent::NoteOn {
                note: data1,
                velocity: data2,
            }),
            status::NOTE_OFF => Some(MidiEvent::NoteOff {
                note: data1,
                velocity: data2,
            }),
            status::CONTROL_CHANGE => Some(MidiEvent::ControlChange {
                controller: data1,
                value: data2,
            }),
            _ => None,
        }
    }

    /// Parse a MIDI message from raw bytes
    pub fn parse(data: &[u8]) -> Option<Self> {
        match data {
            [status, data1, data2, ..] => Self::classify(*status, *data1, *data2),
            _ => None,
        }
    }

    /// Encode the event to MIDI bytes
    pub fn encode(&self) -> [u8; 3] {
        match *self {
            MidiEvent::NoteOn { note, velocity } => [status::NOTE_ON, note & 0x7F, velocity & 0x7F],
            MidiEvent::NoteOff { note, velocity } => {
                [status::NOTE_OFF, note & 0x7F, velocity & 0x7F]
            }
            MidiEvent::ControlChange { controller, value } => {
                [status::CONTROL_CHANGE, controller & 0x7F, value & 0x7F]
            }
        }
    }
}

impl fmt::Display for MidiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiEvent::NoteOn { note, velocity } => write!(f, "NoteOn n:{} v:{}", note, velocity),
            MidiEvent::NoteOff { note, velocity } => write!(f, "NoteOff n:{} v:{}", note, velocity),
            MidiEvent::ControlChange { controller, value } => {
                write!(f, "CC cc:{} v:{}", controller, value)
            }
        }
    }
}

/// Classifies raw input and publishes it on the shared event bus
///
/// Runs on the MIDI input thread: classification is synchronous and never
/// blocks, every downstream reaction happens on the subscribers' tasks.
#[derive(Clone)]
pub struct Classifier {
    bus: Arc<EventBus<MidiEvent>>,
}

impl Classifier {
    pub fn new(bus: Arc<EventBus<MidiEvent>>) -> Self {
        Self { bus }
    }

    /// Classify one raw triple and broadcast it
    pub fn dispatch(&self, status: u8, data1: u8, data2: u8) -> Option<MidiEvent> {
        let event = MidiEvent::classify(status, data1, data2)?;
        let delivered = self.bus.publish(event);
        trace!(%event, delivered, "Classified surface input");
        Some(event)
    }

    /// Classify a raw byte slice as delivered by the MIDI backend
    pub fn dispatch_raw(&self, data: &[u8]) -> Option<MidiEvent> {
        match data {
            [status, data1, data2, ..] => self.dispatch(*status, *data1, *data2),
            _ => None,
        }
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
