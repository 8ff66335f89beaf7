//! Pads controller
//!
//! Pad presses play drum notes, toggle mute/solo or select a pad
//! depending on the pads mode and the select button.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::trace;

use super::SurfaceContext;
use crate::bus::EventBus;
use crate::daw::DawEvent;
use crate::feedback;
use crate::midi::MidiEvent;
use crate::state::PadsMode;
use crate::surface::layout::note;

struct PadsController {
    ctx: Arc<SurfaceContext>,
}

impl PadsController {
    fn on_midi(&self, event: MidiEvent) {
        let state = &self.ctx.state;
        match event {
            MidiEvent::NoteOn { note, velocity } if note::PADS.contains(&note) => {
                let index = usize::from(note - note::PAD_BASE);
                let select_pressed = state.select_pressed.get();

                if select_pressed {
                    state.select_pad(index + state.pad_offset());
                }

                match state.pads_mode.get() {
                    PadsMode::Play => {
                        if !select_pressed {
                            self.ctx.leds.send(MidiEvent::NoteOn { note, velocity });
                        }
                    }
                    PadsMode::Mute => self.ctx.resolver.resolve_bank().pad(index).toggle_mute(),
                    PadsMode::Solo => self.ctx.resolver.resolve_bank().pad(index).toggle_solo(),
                }
            }
            MidiEvent::NoteOff { note, velocity } if note::PADS.contains(&note) => {
                if state.pads_mode.get() == PadsMode::Play {
                    self.ctx.leds.send(MidiEvent::NoteOff { note, velocity });
                }
            }
            _ => {}
        }
    }

    fn on_daw(&self, event: DawEvent) {
        let mode = self.ctx.state.pads_mode.get();
        match event {
            DawEvent::TrackNote { key, on } if mode == PadsMode::Play => {
                let switched = self.ctx.state.pad_bank_switched.get();
                if let Some(pad) = feedback::track_note_pad(key, switched) {
                    trace!(key, pad, on, "Track note");
                    self.ctx.leds.set(pad, on);
                }
            }
            DawEvent::MuteChanged { hierarchy, slot, muted } if mode == PadsMode::Mute => {
                if hierarchy == self.ctx.resolver.hierarchy() {
                    self.ctx.leds.set(note::PAD_BASE + slot as u8, muted);
                }
            }
            DawEvent::SoloChanged { hierarchy, slot, soloed } if mode == PadsMode::Solo => {
                if hierarchy == self.ctx.resolver.hierarchy() {
                    self.ctx.leds.set(note::PAD_BASE + slot as u8, soloed);
                }
            }
            _ => {}
        }
    }

    fn on_selected_pad(&self, pad: usize) {
        let switched = self.ctx.state.pad_bank_switched.get();
        self.ctx.leds.apply(&feedback::selected_pad_leds(pad, switched));
    }
}

pub(super) fn spawn(ctx: &Arc<SurfaceContext>, bus: &EventBus<MidiEvent>) -> Vec<JoinHandle<()>> {
    let mut midi = bus.subscribe();
    let mut daw = ctx.daw.subscribe();
    let mut selected_pad = ctx.state.selected_pad.subscribe();
    let controller = PadsController { ctx: ctx.clone() };

    vec![tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(event) = midi.recv() => controller.on_midi(event),
                Some(event) = daw.recv() => controller.on_daw(event),
                Some(pad) = selected_pad.recv() => controller.on_selected_pad(pad),
                else => break,
            }
        }
    })]
}
