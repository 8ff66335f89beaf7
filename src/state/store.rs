//! ModeState - owner of every UI-mode state cell
//!
//! Controllers mutate state only through the setters below and react to
//! changes by subscribing to individual cells.

use super::cell::StateCell;
use super::types::{PadsMode, ParameterBank, StepsMode};
use tracing::debug;

/// Number of pads in one bank; `selected_pad` is reduced by it at use
pub const PAD_BANK_SIZE: usize = 8;

/// All mode state of the surface
pub struct ModeState {
    pub steps_mode: StateCell<StepsMode>,
    pub bank: StateCell<i32>,
    pub pads_mode: StateCell<PadsMode>,
    pub parameter_bank: StateCell<ParameterBank>,
    pub selected_pattern: StateCell<i32>,
    pub playing_pattern: StateCell<i32>,
    pub clip_page_position: StateCell<i32>,
    /// 0-7 = lower bank, 8-15 = upper bank
    pub selected_pad: StateCell<usize>,
    pub select_pressed: StateCell<bool>,
    pub pad_bank_switched: StateCell<bool>,
    pub instrument_selector_browsing: StateCell<bool>,
    pub velocity_off: StateCell<bool>,
}

impl ModeState {
    pub fn new() -> Self {
        Self {
            steps_mode: StateCell::new("steps_mode", StepsMode::default()),
            bank: StateCell::new("bank", 0),
            pads_mode: StateCell::new("pads_mode", PadsMode::default()),
            parameter_bank: StateCell::new("parameter_bank", ParameterBank::default()),
            selected_pattern: StateCell::new("selected_pattern", 0),
            playing_pattern: StateCell::new("playing_pattern", 0),
            clip_page_position: StateCell::new("clip_page_position", 0),
            selected_pad: StateCell::new("selected_pad", 0),
            select_pressed: StateCell::new("select_pressed", false),
            pad_bank_switched: StateCell::new("pad_bank_switched", false),
            instrument_selector_browsing: StateCell::new("instrument_selector_browsing", false),
            velocity_off: StateCell::new("velocity_off", false),
        }
    }

    pub fn set_steps_mode(&self, mode: StepsMode) {
        debug!(%mode, "Steps mode");
        self.steps_mode.set(mode);
    }

    pub fn set_bank(&self, bank: i32) {
        self.bank.set(bank);
    }

    pub fn set_selected_pattern(&self, pattern: i32) {
        self.selected_pattern.set(pattern);
    }

    pub fn set_playing_pattern(&self, pattern: i32) {
        self.playing_pattern.set(pattern);
    }

    pub fn set_parameter_bank(&self, bank: ParameterBank) {
        debug!(%bank, "Parameter bank");
        self.parameter_bank.set(bank);
    }

    /// Step one page back, never below page 0
    pub fn previous_clip_page_position(&self) {
        let current = self.clip_page_position.get();
        if current > 0 {
            self.set_clip_page_position(current - 1);
        }
    }

    /// Step one page forward while the page stays below `loop_length / 4 - 1`
    pub fn next_clip_page_position(&self, loop_length: f64) {
        let current = self.clip_page_position.get();
        if f64::from(current) < loop_length / 4.0 - 1.0 {
            self.set_clip_page_position(current + 1);
        }
    }

    /// Negative positions are ignored
    pub fn set_clip_page_position(&self, position: i32) {
        if position < 0 {
            return;
        }
        self.clip_page_position.set(position);
    }

    pub fn set_pads_mode(&self, mode: PadsMode) {
        debug!(%mode, "Pads mode");
        self.pads_mode.set(mode);
    }

    pub fn set_select_pressed(&self, pressed: bool) {
        self.select_pressed.set(pressed);
    }

    pub fn select_pad(&self, pad: usize) {
        debug!(pad, "Pad selected");
        self.selected_pad.set(pad);
    }

    pub fn set_pad_bank_switched(&self, switched: bool) {
        self.pad_bank_switched.set(switched);
    }

    /// Toggle between the lower and upper pad bank
    pub fn switch_pad_bank(&self) -> bool {
        let switched = self.pad_bank_switched.update(|v| !v);
        debug!(switched, "Pad bank switched");
        switched
    }

    pub fn toggle_instrument_selector_browsing(&self) -> bool {
        self.instrument_selector_browsing.update(|v| !v)
    }

    pub fn toggle_velocity_off(&self) -> bool {
        self.velocity_off.update(|v| !v)
    }

    /// Selected pad reduced to a slot of the active bank
    pub fn selected_slot(&self) -> usize {
        self.selected_pad.get() % PAD_BANK_SIZE
    }

    /// Offset added to pad indices when the upper bank is active
    pub fn pad_offset(&self) -> usize {
        if self.pad_bank_switched.get() {
            PAD_BANK_SIZE
        } else {
            0
        }
    }
}

impl Default for ModeState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = ModeState::new();
        assert_eq!(state.steps_mode.get(), StepsMode::Bank);
        assert_eq!(state.pads_mode.get(), PadsMode::Play);
        assert_eq!(state.parameter_bank.get(), ParameterBank::PanLevel);
        assert_eq!(state.selected_pad.get(), 0);
        assert!(!state.velocity_off.get());
    }

    #[test]
    fn test_next_clip_page_bounded_by_loop_length() {
        let state = ModeState::new();
        state.next_clip_page_position(8.0);
        assert_eq!(state.clip_page_position.get(), 1);
        state.next_clip_page_position(8.0);
        assert_eq!(state.clip_page_position.get(), 1);
        state.next_clip_page_position(16.0);
        state.next_clip_page_position(16.0);
        state.next_clip_page_position(16.0);
        assert_eq!(state.clip_page_position.get(), 3);
    }

    #[test]
    fn test_previous_clip_page_stops_at_zero() {
        let state = ModeState::new();
        state.previous_clip_page_position();
        assert_eq!(state.clip_page_position.get(), 0);
        state.set_clip_page_position(2);
        state.previous_clip_page_position();
        assert_eq!(state.clip_page_position.get(), 1);
    }

    #[test]
    fn test_negative_page_ignored() {
        let state = ModeState::new();
        state.set_clip_page_position(2);
        state.set_clip_page_position(-1);
        assert_eq!(state.clip_page_position.get(), 2);
    }

    #[test]
    fn test_double_switch_restores_bank() {
        let state = ModeState::new();
        assert!(state.switch_pad_bank());
        assert_eq!(state.pad_offset(), 8);
        assert!(!state.switch_pad_bank());
        assert_eq!(state.pad_offset(), 0);
    }

    #[test]
    fn test_selected_pad_reduced_at_use() {
        let state = ModeState::new();
        state.select_pad(11);
        assert_eq!(state.selected_pad.get(), 11);
        assert_eq!(state.selected_slot(), 3);
    }
}
