//! Hardware layout of the Arturia SparkLE
//!
//! Notes double as LED addresses: sending a note on lights the LED of the
//! control with the same number.

use std::ops::Range;

pub const STEP_COUNT: usize = 16;

/// Pad key minus this shift gives the drum note of the lower bank
pub const PAD_TO_DRUM_NOTE_SHIFT: u8 = 24;
/// Drum note of pad 0 in the lower bank
pub const DRUM_NOTE_BASE: u8 = 36;

/// Loop length bounds and granularity, in beats
pub const LOOP_LENGTH_STEP: f64 = 4.0;
pub const LOOP_LENGTH_MIN: f64 = 4.0;
pub const LOOP_LENGTH_MAX: f64 = 16.0;

/// Length of clips created on an empty pattern slot, in beats
pub const NEW_CLIP_BEATS: u32 = 4;

/// Highest note touched by the shutdown sweep
pub const LAST_LED: u8 = 75;

pub mod note {
    use super::Range;

    /// Step buttons 1-16
    pub const STEPS: Range<u8> = 0..16;

    pub const BANK: u8 = 16;
    pub const PATTERN: u8 = 17;
    pub const SEQUENCER: u8 = 18;
    pub const TUNE: u8 = 19;
    pub const SELECT: u8 = 20;
    pub const PAD_BANK_SWITCHER: u8 = 21;
    pub const MUTE: u8 = 22;
    pub const SOLO: u8 = 23;

    pub const REC: u8 = 24;
    pub const STOP: u8 = 25;
    pub const PLAY_PAUSE: u8 = 26;

    pub const INSTRUMENT_FILTER: u8 = 33;
    pub const SEND_1_2: u8 = 34;
    pub const PAN_LEVEL: u8 = 35;

    pub const PATTERN_LENGTH_LEFT: u8 = 36;
    pub const PATTERN_LENGTH_RIGHT: u8 = 37;

    pub const BROWSER_INSTRUMENT: u8 = 38;
    pub const BROWSER_KIT: u8 = 39;
    pub const BROWSER_PROJECT: u8 = 40;

    /// Pattern length / page indicators 1-4
    pub const PATTERN_LEDS: Range<u8> = 41..45;
    pub const PATTERN_LED_1: u8 = 41;

    pub const BROWSER_DIAL_PUSH: u8 = 56;

    pub const PADS: Range<u8> = 60..68;
    pub const PAD_BASE: u8 = 60;
    pub const PAD_LEDS: Range<u8> = 68..76;
    pub const PAD_LED_BASE: u8 = 68;

    /// Step button doubling as metronome toggle while select is held
    pub const STEP_14: u8 = 13;
    /// Step button doubling as velocity-off toggle while select is held
    pub const STEP_16: u8 = 15;
}

pub mod cc {
    pub const VOLUME: u8 = 47;
    pub const TEMPO: u8 = 48;
    pub const PARAM_1: u8 = 49;
    pub const PARAM_2: u8 = 50;
    pub const PARAM_3: u8 = 51;
    pub const BROWSER_DIAL: u8 = 54;
}

/// Relative encoder values
pub mod encoder {
    pub const MINUS: u8 = 63;
    pub const PLUS: u8 = 65;
    /// Center value subtracted from relative knob values
    pub const CENTER: i32 = 64;

    /// Signed delta of a relative knob value
    pub fn delta(value: u8) -> i32 {
        i32::from(value) - CENTER
    }
}
