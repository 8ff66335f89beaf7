//! SparkLE control surface
//!
//! [`LedSink`] is the only way the router talks back to the hardware.
//! Writes are fire-and-forget: nothing is retried and failures are
//! logged by the sink.

pub mod driver;
pub mod layout;

pub use driver::{SurfaceDriver, SurfaceError};

use crate::feedback::LedFrame;
use crate::midi::MidiEvent;

/// Output side of the surface
pub trait LedSink: Send + Sync {
    /// Send one raw event to the surface
    fn send(&self, event: MidiEvent);

    fn note_on(&self, note: u8) {
        self.send(MidiEvent::NoteOn { note, velocity: 127 });
    }

    fn note_off(&self, note: u8) {
        self.send(MidiEvent::NoteOff { note, velocity: 0 });
    }

    fn set(&self, note: u8, on: bool) {
        if on {
            self.note_on(note);
        } else {
            self.note_off(note);
        }
    }

    /// Write every LED of a frame in order
    fn apply(&self, frame: &LedFrame) {
        for write in frame.iter() {
            self.set(write.note, write.on);
        }
    }
}

#[cfg(test)]
pub use recording::RecordingLeds;

#[cfg(test)]
mod recording {
    use super::LedSink;
    use crate::midi::MidiEvent;
    use parking_lot::Mutex;

    /// LED sink keeping every event for assertions
    #[derive(Default)]
    pub struct RecordingLeds {
        events: Mutex<Vec<MidiEvent>>,
    }

    impl RecordingLeds {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<MidiEvent> {
            self.events.lock().clone()
        }

        pub fn clear(&self) {
            self.events.lock().clear();
        }

        /// Last written state of `note`, if it was written at all
        pub fn state_of(&self, note: u8) -> Option<bool> {
            self.events.lock().iter().rev().find_map(|event| match *event {
                MidiEvent::NoteOn { note: n, velocity } if n == note => Some(velocity > 0),
                MidiEvent::NoteOff { note: n, .. } if n == note => Some(false),
                _ => None,
            })
        }

        /// Notes whose last write turned them on
        pub fn lit(&self) -> Vec<u8> {
            (0..=127u8).filter(|&n| self.state_of(n) == Some(true)).collect()
        }

        /// Note-on events for `note`
        pub fn note_ons(&self, note: u8) -> usize {
            self.events
                .lock()
                .iter()
                .filter(|e| matches!(e, MidiEvent::NoteOn { note: n, .. } if *n == note))
                .count()
        }
    }

    impl LedSink for RecordingLeds {
        fn send(&self, event: MidiEvent) {
            self.events.lock().push(event);
        }
    }
}
