//! Transport controller
//!
//! Play, stop, record, metronome, tempo and groove shuffle.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use super::SurfaceContext;
use crate::bus::EventBus;
use crate::daw::{DawEvent, Transport};
use crate::device::FINE_RESOLUTION;
use crate::midi::MidiEvent;
use crate::surface::layout::{cc, encoder, note};

/// Raw tempo change per knob tick, in BPM
const TEMPO_STEP: f64 = 0.1;

struct TransportController {
    ctx: Arc<SurfaceContext>,
    transport: Arc<dyn Transport>,
}

impl TransportController {
    fn on_midi(&self, event: MidiEvent) {
        match event {
            MidiEvent::NoteOn { note, .. } => match note {
                note::PLAY_PAUSE => self.transport.continue_playback(),
                note::STOP => self.transport.stop(),
                note::REC => self.transport.toggle_overdub(),
                note::STEP_14 if self.ctx.state.select_pressed.get() => {
                    self.transport.toggle_metronome();
                }
                _ => {}
            },
            MidiEvent::ControlChange {
                controller: cc::TEMPO,
                value,
            } => self.on_tempo_knob(value),
            _ => {}
        }
    }

    /// Tempo knob, or groove shuffle while select is held
    fn on_tempo_knob(&self, value: u8) {
        if self.ctx.state.select_pressed.get() {
            let shuffle = self.transport.shuffle();
            if shuffle.exists() {
                shuffle.inc(encoder::delta(value), FINE_RESOLUTION);
            }
            return;
        }

        let bpm = if value == encoder::MINUS {
            -TEMPO_STEP
        } else {
            TEMPO_STEP
        };
        debug!(bpm, "Tempo change");
        self.transport.inc_tempo(bpm);
    }

    fn on_daw(&self, event: DawEvent) {
        let leds = &self.ctx.leds;
        match event {
            DawEvent::Playing(playing) => leds.set(note::PLAY_PAUSE, playing),
            DawEvent::OverdubEnabled(enabled) => leds.set(note::REC, enabled),
            DawEvent::MetronomeEnabled(enabled) if self.ctx.state.select_pressed.get() => {
                leds.set(note::STEP_14, enabled);
            }
            _ => {}
        }
    }
}

pub(super) fn spawn(ctx: &Arc<SurfaceContext>, bus: &EventBus<MidiEvent>) -> Vec<JoinHandle<()>> {
    let mut midi = bus.subscribe();
    let mut daw = ctx.daw.subscribe();
    let controller = TransportController {
        ctx: ctx.clone(),
        transport: ctx.daw.transport(),
    };

    vec![tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(event) = midi.recv() => controller.on_midi(event),
                Some(event) = daw.recv() => controller.on_daw(event),
                else => break,
            }
        }
    })]
}
