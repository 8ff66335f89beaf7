//! Pad controls controller
//!
//! Select button, pad bank switcher, Mute/Solo modes and the
//! velocity-off toggle, with their LEDs.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::SurfaceContext;
use crate::bus::EventBus;
use crate::daw::{DawEvent, DrumPad, DrumPadBank, Transport};
use crate::feedback::{self, LedFrame};
use crate::midi::MidiEvent;
use crate::state::{PadsMode, StepsMode, PAD_BANK_SIZE};
use crate::surface::layout::{note, DRUM_NOTE_BASE};

/// Root bank scroll position of the lower pad bank
const FIRST_BANK_SCROLL_POSITION: i32 = DRUM_NOTE_BASE as i32;

struct PadControlsController {
    ctx: Arc<SurfaceContext>,
    transport: Arc<dyn Transport>,
    bank_state_restored: bool,
}

impl PadControlsController {
    fn on_midi(&self, event: MidiEvent) {
        let state = &self.ctx.state;
        match event {
            MidiEvent::NoteOn { note, .. } => match note {
                note::SELECT => state.set_select_pressed(true),
                note::PAD_BANK_SWITCHER => {
                    state.switch_pad_bank();
                }
                note::MUTE => self.toggle_pads_mode(PadsMode::Mute),
                note::SOLO => self.toggle_pads_mode(PadsMode::Solo),
                note::STEP_16 if state.select_pressed.get() => {
                    let off = state.toggle_velocity_off();
                    info!("Velocity off: {}", off);
                }
                _ => {}
            },
            MidiEvent::NoteOff { note: note::SELECT, .. } => state.set_select_pressed(false),
            _ => {}
        }
    }

    /// Enter `mode`, or go back to Play when it is already active
    ///
    /// Leaving with select held also clears every mute or solo of the bank.
    fn toggle_pads_mode(&self, mode: PadsMode) {
        let state = &self.ctx.state;
        if state.pads_mode.get() != mode {
            state.set_pads_mode(mode);
            return;
        }

        state.set_pads_mode(PadsMode::Play);
        if state.select_pressed.get() {
            let bank = self.ctx.resolver.resolve_bank();
            match mode {
                PadsMode::Mute => bank.clear_muted_pads(),
                PadsMode::Solo => bank.clear_soloed_pads(),
                PadsMode::Play => {}
            }
        }
        self.ctx.leds.apply(&feedback::pads_off());
    }

    fn on_daw(&mut self, event: DawEvent) {
        // The first reported position tells which bank the DAW shows
        if let DawEvent::PadBankScrollPosition(position) = event {
            if position != 0 && !self.bank_state_restored {
                self.bank_state_restored = true;
                let switched = position != FIRST_BANK_SCROLL_POSITION;
                debug!(position, switched, "Restoring pad bank state");
                self.ctx.state.set_pad_bank_switched(switched);
            }
        }
    }

    fn on_select(&self, pressed: bool) {
        let state = &self.ctx.state;
        let mut frame = LedFrame::new();

        if pressed {
            frame.set(note::SELECT, true).extend(feedback::steps_off());
            if state.steps_mode.get() == StepsMode::Pattern {
                if let Ok(pattern) = u8::try_from(state.selected_pattern.get()) {
                    frame.set(pattern, true);
                }
            }
            if self.transport.is_metronome_enabled() {
                frame.set(note::STEP_14, true);
            }
            if state.velocity_off.get() {
                frame.set(note::STEP_16, true);
            }
        } else {
            frame
                .set(note::SELECT, false)
                .set(note::STEP_14, false)
                .set(note::STEP_16, false);
            let held = self.ctx.held.lock().row(state.selected_pad.get());
            frame.extend(feedback::steps_row(
                state.steps_mode.get(),
                state.bank.get(),
                state.playing_pattern.get(),
                &held,
            ));
        }

        self.ctx.leds.apply(&frame);
    }

    fn on_pads_mode(&self, mode: PadsMode) {
        let mut frame = feedback::pads_mode_leds(mode);
        let bank = self.ctx.resolver.resolve_bank();
        let flags: Option<Vec<bool>> = match mode {
            PadsMode::Mute => Some(pad_flags(bank.as_ref(), |pad| pad.is_muted())),
            PadsMode::Solo => Some(pad_flags(bank.as_ref(), |pad| pad.is_soloed())),
            PadsMode::Play => None,
        };
        if let Some(flags) = flags {
            frame.extend(feedback::pad_flag_leds(&flags));
        }
        self.ctx.leds.apply(&frame);
    }

    fn on_pad_bank_switched(&self, switched: bool) {
        self.ctx.resolver.switch_drum_pad_bank(switched);

        let mut frame = LedFrame::new();
        frame.set(note::PAD_BANK_SWITCHER, switched);
        frame.extend(feedback::selected_pad_leds(
            self.ctx.state.selected_pad.get(),
            switched,
        ));
        self.ctx.leds.apply(&frame);
    }
}

fn pad_flags(bank: &dyn DrumPadBank, flag: impl Fn(&dyn DrumPad) -> bool) -> Vec<bool> {
    (0..PAD_BANK_SIZE).map(|slot| flag(bank.pad(slot).as_ref())).collect()
}

pub(super) fn spawn(ctx: &Arc<SurfaceContext>, bus: &EventBus<MidiEvent>) -> Vec<JoinHandle<()>> {
    let mut midi = bus.subscribe();
    let mut daw = ctx.daw.subscribe();
    let mut select = ctx.state.select_pressed.subscribe();
    let mut pads_mode = ctx.state.pads_mode.subscribe();
    let mut velocity_off = ctx.state.velocity_off.subscribe();
    let mut switched = ctx.state.pad_bank_switched.subscribe();

    let mut controller = PadControlsController {
        ctx: ctx.clone(),
        transport: ctx.daw.transport(),
        bank_state_restored: false,
    };

    vec![tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(event) = midi.recv() => controller.on_midi(event),
                Some(event) = daw.recv() => controller.on_daw(event),
                Some(pressed) = select.recv() => controller.on_select(pressed),
                Some(mode) = pads_mode.recv() => controller.on_pads_mode(mode),
                Some(off) = velocity_off.recv() => controller.ctx.leds.set(note::STEP_16, off),
                Some(value) = switched.recv() => controller.on_pad_bank_switched(value),
                else => break,
            }
        }
    })]
}
