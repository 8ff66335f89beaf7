//! Steps controller
//!
//! The 16 step buttons change meaning with the steps mode:
//! - Bank: scroll the clip launcher by banks of 16 slots
//! - Pattern: select and launch clip slots
//! - Sequencer: toggle notes of the selected pad in the cursor clip
//! - Tune: transpose the selected pad's sampler
//!
//! Also handles the pattern length buttons and the step sequencer playhead.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use super::SurfaceContext;
use crate::bus::EventBus;
use crate::daw::{ClipLauncher, CursorClip, DawEvent};
use crate::feedback;
use crate::midi::MidiEvent;
use crate::state::StepsMode;
use crate::surface::layout::{
    note, DRUM_NOTE_BASE, LOOP_LENGTH_MAX, LOOP_LENGTH_MIN, LOOP_LENGTH_STEP, NEW_CLIP_BEATS,
    STEP_COUNT,
};

/// Clip launcher slots per bank
const SLOTS_PER_BANK: i32 = STEP_COUNT as i32;
/// Step button of the unshifted transposition
const TUNE_CENTER_STEP: i32 = 8;
const SEQUENCER_VELOCITY: u8 = 127;

struct StepsController {
    ctx: Arc<SurfaceContext>,
    clip: Arc<dyn CursorClip>,
    launcher: Arc<dyn ClipLauncher>,
}

impl StepsController {
    fn on_midi(&self, event: MidiEvent) {
        let MidiEvent::NoteOn { note, .. } = event else {
            return;
        };
        let state = &self.ctx.state;

        match note {
            note::BANK => state.set_steps_mode(StepsMode::Bank),
            note::PATTERN => state.set_steps_mode(StepsMode::Pattern),
            note::SEQUENCER => state.set_steps_mode(StepsMode::Sequencer),
            note::TUNE => state.set_steps_mode(StepsMode::Tune),
            note::PATTERN_LENGTH_LEFT => {
                if state.select_pressed.get() {
                    self.resize_loop(-LOOP_LENGTH_STEP);
                } else {
                    state.previous_clip_page_position();
                }
            }
            note::PATTERN_LENGTH_RIGHT => {
                if state.select_pressed.get() {
                    self.resize_loop(LOOP_LENGTH_STEP);
                } else {
                    state.next_clip_page_position(self.clip.loop_length());
                }
            }
            step if note::STEPS.contains(&step) => self.on_step(step),
            _ => {}
        }
    }

    fn resize_loop(&self, delta: f64) {
        let length = self.clip.loop_length() + delta;
        if (LOOP_LENGTH_MIN..=LOOP_LENGTH_MAX).contains(&length) {
            debug!(length, "Loop length");
            self.clip.set_loop_length(length);
        }
    }

    fn on_step(&self, step: u8) {
        let state = &self.ctx.state;
        let select_pressed = state.select_pressed.get();
        let slot = usize::from(step);

        match state.steps_mode.get() {
            // Select + step is reserved for the metronome and velocity-off toggles
            StepsMode::Bank if !select_pressed => {
                self.launcher.set_scroll_position(i32::from(step) * SLOTS_PER_BANK);
            }
            StepsMode::Pattern => {
                self.launcher.select(slot);
                if select_pressed {
                    return;
                }
                if !self.launcher.has_content(slot) {
                    self.launcher.create_empty_clip(slot, NEW_CLIP_BEATS);
                }
                self.launcher.launch(slot);
            }
            StepsMode::Sequencer if !select_pressed => {
                let Ok(pad) = u8::try_from(state.selected_pad.get()) else {
                    return;
                };
                trace!(step, pad, "Toggling step");
                self.clip.toggle_step(step, DRUM_NOTE_BASE + pad, SEQUENCER_VELOCITY);
            }
            StepsMode::Tune if !select_pressed => {
                self.ctx.resolver.set_sampler_transposition(i32::from(step) - TUNE_CENTER_STEP);
            }
            _ => {}
        }
    }

    fn on_daw(&self, event: DawEvent) {
        let state = &self.ctx.state;
        match event {
            DawEvent::LauncherScrollPosition(position) => state.set_bank(position / SLOTS_PER_BANK),
            DawEvent::SlotSelected(slot) => state.set_selected_pattern(slot as i32),
            DawEvent::SlotPlaying(slot) => state.set_playing_pattern(slot as i32),
            DawEvent::NoteStep { step, key, on } => self.on_note_step(step, key, on),
            DawEvent::PlayingStep(playing) => self.on_playing_step(playing),
            DawEvent::LoopLength(_) => self.refresh_pattern_length(),
            _ => {}
        }
    }

    fn on_note_step(&self, step: u8, key: u8, on: bool) {
        let Some(pad) = self.ctx.held.lock().apply(step, key, on) else {
            return;
        };

        let state = &self.ctx.state;
        let visible = state.steps_mode.get() == StepsMode::Sequencer
            && !state.select_pressed.get()
            && pad == state.selected_pad.get()
            && note::STEPS.contains(&step);
        if visible {
            self.ctx.leds.set(step, on);
        }
    }

    fn on_playing_step(&self, playing: i32) {
        let state = &self.ctx.state;
        if state.steps_mode.get() != StepsMode::Sequencer || state.select_pressed.get() {
            return;
        }

        let held = self.ctx.held.lock().row(state.selected_pad.get());
        let frame = feedback::sequencer_playhead(playing, state.clip_page_position.get(), &held);
        self.ctx.leds.apply(&frame);
    }

    /// Repaint the pattern LEDs, pulling the page back inside a shrunk loop
    fn refresh_pattern_length(&self) {
        let state = &self.ctx.state;
        let (frame, clamped) = feedback::pattern_length_leds(
            self.clip.loop_length(),
            state.clip_page_position.get(),
            state.select_pressed.get(),
        );
        self.ctx.leds.apply(&frame);

        if let Some(page) = clamped {
            debug!(page, "Clip page clamped to loop length");
            state.set_clip_page_position(page);
        }
    }

    fn on_steps_mode(&self, mode: StepsMode) {
        let state = &self.ctx.state;
        let held = self.ctx.held.lock().row(state.selected_pad.get());
        let frame = feedback::steps_mode_frame(
            mode,
            state.bank.get(),
            state.playing_pattern.get(),
            &held,
        );
        self.ctx.leds.apply(&frame);
    }

    fn on_bank(&self, bank: i32) {
        info!("Bank {}", bank + 1);
        if self.row_shows(StepsMode::Bank, false) {
            self.ctx.leds.apply(&feedback::step_row(bank));
        }
    }

    fn on_playing_pattern(&self, pattern: i32) {
        if self.row_shows(StepsMode::Pattern, false) {
            self.ctx.leds.apply(&feedback::step_row(pattern));
        }
    }

    fn on_selected_pattern(&self, pattern: i32) {
        if self.row_shows(StepsMode::Pattern, true) {
            self.ctx.leds.apply(&feedback::step_row(pattern));
        }
    }

    fn on_select(&self) {
        if self.ctx.state.steps_mode.get() == StepsMode::Sequencer {
            self.refresh_pattern_length();
        }
    }

    fn on_page(&self, page: i32) {
        self.clip.scroll_to_step(page * STEP_COUNT as i32);
        self.refresh_pattern_length();
    }

    fn on_selected_pad(&self, pad: usize) {
        if self.row_shows(StepsMode::Sequencer, false) {
            let held = self.ctx.held.lock().row(pad);
            self.ctx.leds.apply(&feedback::held_row(&held));
        }
    }

    /// Whether the step row currently belongs to `mode` with select in `select_pressed`
    fn row_shows(&self, mode: StepsMode, select_pressed: bool) -> bool {
        let state = &self.ctx.state;
        state.steps_mode.get() == mode && state.select_pressed.get() == select_pressed
    }
}

pub(super) fn spawn(ctx: &Arc<SurfaceContext>, bus: &EventBus<MidiEvent>) -> Vec<JoinHandle<()>> {
    let state = &ctx.state;
    let mut midi = bus.subscribe();
    let mut daw = ctx.daw.subscribe();
    let mut steps_mode = state.steps_mode.subscribe();
    let mut bank = state.bank.subscribe();
    let mut playing_pattern = state.playing_pattern.subscribe();
    let mut selected_pattern = state.selected_pattern.subscribe();
    let mut select = state.select_pressed.subscribe();
    let mut page = state.clip_page_position.subscribe();
    let mut selected_pad = state.selected_pad.subscribe();

    let controller = StepsController {
        ctx: ctx.clone(),
        clip: ctx.daw.cursor_clip(),
        launcher: ctx.daw.clip_launcher(),
    };

    vec![tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(event) = midi.recv() => controller.on_midi(event),
                Some(event) = daw.recv() => controller.on_daw(event),
                Some(mode) = steps_mode.recv() => controller.on_steps_mode(mode),
                Some(value) = bank.recv() => controller.on_bank(value),
                Some(pattern) = playing_pattern.recv() => controller.on_playing_pattern(pattern),
                Some(pattern) = selected_pattern.recv() => controller.on_selected_pattern(pattern),
                Some(_) = select.recv() => controller.on_select(),
                Some(value) = page.recv() => controller.on_page(value),
                Some(pad) = selected_pad.recv() => controller.on_selected_pad(pad),
                else => break,
            }
        }
    })]
}
