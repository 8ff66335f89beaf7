//! LED feedback projections
//!
//! Every function here is a pure projection from state to an ordered list
//! of LED writes. Controllers recompute the projection on each relevant
//! change and push the frame to the [`LedSink`](crate::surface::LedSink);
//! a stale frame is simply overwritten by the next one.

use std::collections::BTreeSet;

use crate::state::{PadsMode, ParameterBank, StepsMode, PAD_BANK_SIZE};
use crate::surface::layout::{self, note, LOOP_LENGTH_STEP, STEP_COUNT};

/// Single LED write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedWrite {
    pub note: u8,
    pub on: bool,
}

impl LedWrite {
    pub fn on(note: u8) -> Self {
        Self { note, on: true }
    }

    pub fn off(note: u8) -> Self {
        Self { note, on: false }
    }
}

/// Ordered list of LED writes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedFrame(Vec<LedWrite>);

impl LedFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, note: u8, on: bool) -> &mut Self {
        self.0.push(LedWrite { note, on });
        self
    }

    pub fn extend(&mut self, other: LedFrame) -> &mut Self {
        self.0.extend(other.0);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &LedWrite> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Final state of `note` after the whole frame, if written
    pub fn final_state(&self, note: u8) -> Option<bool> {
        self.0.iter().rev().find(|w| w.note == note).map(|w| w.on)
    }

    /// Notes left on after the whole frame
    pub fn lit(&self) -> BTreeSet<u8> {
        let mut lit = BTreeSet::new();
        for write in &self.0 {
            if write.on {
                lit.insert(write.note);
            } else {
                lit.remove(&write.note);
            }
        }
        lit
    }
}

impl From<Vec<LedWrite>> for LedFrame {
    fn from(writes: Vec<LedWrite>) -> Self {
        Self(writes)
    }
}

fn off_range(range: std::ops::Range<u8>) -> LedFrame {
    range.map(LedWrite::off).collect::<Vec<_>>().into()
}

pub fn steps_off() -> LedFrame {
    off_range(note::STEPS)
}

pub fn pads_off() -> LedFrame {
    off_range(note::PADS)
}

/// Everything off: the named indicators first, then every note up to the pad LEDs
pub fn shutdown_sweep() -> LedFrame {
    let mut frame = LedFrame::new();
    frame
        .set(note::PAN_LEVEL, false)
        .set(note::SEQUENCER, false)
        .set(note::PATTERN_LED_1, false);
    for n in 0..=layout::LAST_LED {
        frame.set(n, false);
    }
    frame
}

/// Pad LEDs 68..75: only the selected pad of the visible bank is lit
pub fn selected_pad_leds(selected_pad: usize, switched: bool) -> LedFrame {
    let offset = if switched { PAD_BANK_SIZE } else { 0 };
    let mut frame = LedFrame::new();
    for led in note::PAD_LEDS {
        let index = usize::from(led - note::PAD_LED_BASE) + offset;
        frame.set(led, index == selected_pad);
    }
    frame
}

/// Pad LEDs 60..67 from per-slot mute or solo flags
pub fn pad_flag_leds(flags: &[bool]) -> LedFrame {
    let mut frame = LedFrame::new();
    for (pad, &flag) in note::PADS.zip(flags) {
        frame.set(pad, flag);
    }
    frame
}

pub fn pads_mode_leds(mode: PadsMode) -> LedFrame {
    let mut frame = LedFrame::new();
    frame
        .set(note::MUTE, mode == PadsMode::Mute)
        .set(note::SOLO, mode == PadsMode::Solo);
    frame
}

pub fn steps_mode_leds(mode: StepsMode) -> LedFrame {
    let mut frame = LedFrame::new();
    frame
        .set(note::BANK, mode == StepsMode::Bank)
        .set(note::PATTERN, mode == StepsMode::Pattern)
        .set(note::SEQUENCER, mode == StepsMode::Sequencer)
        .set(note::TUNE, mode == StepsMode::Tune);
    frame
}

pub fn parameter_bank_leds(bank: ParameterBank) -> LedFrame {
    let mut frame = LedFrame::new();
    frame
        .set(note::INSTRUMENT_FILTER, bank == ParameterBank::Filter)
        .set(note::SEND_1_2, bank == ParameterBank::Sends)
        .set(note::PAN_LEVEL, bank == ParameterBank::PanLevel);
    frame
}

/// Step row with exactly `active` lit (nothing lit when out of range)
pub fn step_row(active: i32) -> LedFrame {
    let mut frame = LedFrame::new();
    for step in note::STEPS {
        frame.set(step, i32::from(step) == active);
    }
    frame
}

/// Steps cleared, then the held steps lit
pub fn held_row(held: &BTreeSet<u8>) -> LedFrame {
    let mut frame = steps_off();
    for &step in held.iter().filter(|&&s| usize::from(s) < STEP_COUNT) {
        frame.set(step, true);
    }
    frame
}

/// Step row of a steps mode: bank index, playing pattern, held steps or nothing
pub fn steps_row(mode: StepsMode, bank: i32, playing_pattern: i32, held: &BTreeSet<u8>) -> LedFrame {
    match mode {
        StepsMode::Bank => step_row(bank),
        StepsMode::Pattern => step_row(playing_pattern),
        StepsMode::Sequencer => held_row(held),
        StepsMode::Tune => steps_off(),
    }
}

/// Full repaint on entering a steps mode
pub fn steps_mode_frame(
    mode: StepsMode,
    bank: i32,
    playing_pattern: i32,
    held: &BTreeSet<u8>,
) -> LedFrame {
    let mut frame = steps_mode_leds(mode);
    frame.extend(steps_row(mode, bank, playing_pattern, held));
    frame
}

/// Sequencer playhead with blink on held steps
///
/// The playing step is inverted (a held step is briefly turned off), every
/// other step not held is turned off, and the previous step is restored
/// when held.
pub fn sequencer_playhead(playing: i32, page: i32, held: &BTreeSet<u8>) -> LedFrame {
    let page_start = page * STEP_COUNT as i32;
    let previous = if playing == 0 { page_start - 1 } else { playing - 1 };

    let mut frame = LedFrame::new();
    for step in note::STEPS {
        let i = i32::from(step);
        let is_held = held.contains(&step);

        if i == playing - page_start {
            frame.set(step, !is_held);
        } else if !is_held {
            frame.set(step, false);
        }

        if i == previous - page_start && is_held {
            frame.set(step, true);
        }
    }
    frame
}

/// Pattern-length indicators 41..44
///
/// With select held the loop length is shown (4, 8, 12, 16 beats light
/// indicators 1 to 4). Otherwise the clip page is shown, after clamping it
/// to the last page of the loop; the clamped page is returned when it
/// differs from `page`.
pub fn pattern_length_leds(
    loop_length: f64,
    page: i32,
    select_pressed: bool,
) -> (LedFrame, Option<i32>) {
    let mut frame = off_range(note::PATTERN_LEDS);

    if select_pressed {
        let quarters = loop_length / LOOP_LENGTH_STEP;
        if quarters.fract() == 0.0 && (1.0..=4.0).contains(&quarters) {
            frame.set(note::PATTERN_LED_1 + quarters as u8 - 1, true);
        }
        return (frame, None);
    }

    let limit = (loop_length / LOOP_LENGTH_STEP - 1.0) as i32;
    let clamped = (page > limit).then_some(limit);
    let page = clamped.unwrap_or(page);
    if (0..4).contains(&page) {
        frame.set(note::PATTERN_LED_1 + page as u8, true);
    }
    (frame, clamped)
}

/// Pad LED for a note sounding on the track, when it belongs to the visible bank
pub fn track_note_pad(key: u8, switched: bool) -> Option<u8> {
    let offset = if switched { PAD_BANK_SIZE as u8 } else { 0 };
    let first = layout::DRUM_NOTE_BASE + offset;
    let last = first + PAD_BANK_SIZE as u8 - 1;
    (first..=last)
        .contains(&key)
        .then(|| key + layout::PAD_TO_DRUM_NOTE_SHIFT - offset)
}

/// Steps holding a note, per pad
#[derive(Debug, Clone)]
pub struct HeldSteps {
    pads: Vec<BTreeSet<u8>>,
}

impl HeldSteps {
    /// One set per pad of both banks
    pub const PADS: usize = 2 * PAD_BANK_SIZE;

    pub fn new() -> Self {
        Self {
            pads: vec![BTreeSet::new(); Self::PADS],
        }
    }

    /// Record a note edit; returns the pad it belongs to
    ///
    /// Keys outside the 16 drum notes starting at 36 are ignored.
    pub fn apply(&mut self, step: u8, key: u8, on: bool) -> Option<usize> {
        let pad = usize::from(key.checked_sub(layout::DRUM_NOTE_BASE)?);
        let set = self.pads.get_mut(pad)?;
        if on {
            set.insert(step);
        } else {
            set.remove(&step);
        }
        Some(pad)
    }

    pub fn row(&self, pad: usize) -> BTreeSet<u8> {
        self.pads.get(pad).cloned().unwrap_or_default()
    }
}

impl Default for HeldSteps {
    fn default() -> Self {
        Self::new()
    }
}
