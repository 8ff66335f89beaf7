//! DAW capability interface
//!
//! The router never talks to a DAW object model directly. Everything it
//! needs is expressed by the narrow traits below; a host integration
//! implements [`DawBinding`] and hands out pre-bound handles once at
//! startup. [`memory::MemoryDaw`] is the in-process implementation used by
//! the standalone binary and the tests.

pub mod memory;

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::translation::{KeyTable, VelocityTable};

/// Which drum machine the surface currently addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hierarchy {
    /// Drum machine at the top of the track
    Root,
    /// Drum machine nested inside the instrument selector
    Nested,
}

impl Hierarchy {
    pub const ALL: [Hierarchy; 2] = [Hierarchy::Root, Hierarchy::Nested];

    /// Nested whenever an instrument selector exists on the track
    pub fn from_selector(instrument_selector_exists: bool) -> Self {
        if instrument_selector_exists {
            Hierarchy::Nested
        } else {
            Hierarchy::Root
        }
    }
}

impl fmt::Display for Hierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hierarchy::Root => write!(f, "root"),
            Hierarchy::Nested => write!(f, "nested"),
        }
    }
}

/// Devices that can be probed on a drum pad chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceKind {
    Sampler,
    Kick,
    Snare,
    Clap,
    Hat,
    Filter,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 6] = [
        DeviceKind::Sampler,
        DeviceKind::Kick,
        DeviceKind::Snare,
        DeviceKind::Clap,
        DeviceKind::Hat,
        DeviceKind::Filter,
    ];
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceKind::Sampler => "Sampler",
            DeviceKind::Kick => "E-Kick",
            DeviceKind::Snare => "E-Snare",
            DeviceKind::Clap => "E-Clap",
            DeviceKind::Hat => "E-Hat",
            DeviceKind::Filter => "Filter",
        };
        write!(f, "{}", name)
    }
}

/// Device-specific parameters addressed by the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamId {
    SamplerMode,
    SamplerSustain,
    SamplerDecay,
    SamplerSpeed,
    KickDecay,
    SnareDecay,
    ClapDecay,
    HatDecay,
    FilterType,
    FilterCutoff,
    FilterResonance,
}

impl ParamId {
    pub const ALL: [ParamId; 11] = [
        ParamId::SamplerMode,
        ParamId::SamplerSustain,
        ParamId::SamplerDecay,
        ParamId::SamplerSpeed,
        ParamId::KickDecay,
        ParamId::SnareDecay,
        ParamId::ClapDecay,
        ParamId::HatDecay,
        ParamId::FilterType,
        ParamId::FilterCutoff,
        ParamId::FilterResonance,
    ];

    /// Device owning the parameter
    pub fn device(self) -> DeviceKind {
        match self {
            ParamId::SamplerMode
            | ParamId::SamplerSustain
            | ParamId::SamplerDecay
            | ParamId::SamplerSpeed => DeviceKind::Sampler,
            ParamId::KickDecay => DeviceKind::Kick,
            ParamId::SnareDecay => DeviceKind::Snare,
            ParamId::ClapDecay => DeviceKind::Clap,
            ParamId::HatDecay => DeviceKind::Hat,
            ParamId::FilterType | ParamId::FilterCutoff | ParamId::FilterResonance => {
                DeviceKind::Filter
            }
        }
    }

    /// Parameter key inside its device
    pub fn key(self) -> &'static str {
        match self {
            ParamId::SamplerMode => "MODE",
            ParamId::SamplerSustain => "AMP_SUSTAIN_LEVEL",
            ParamId::SamplerDecay => "AMP_DECAY_TIME",
            ParamId::SamplerSpeed => "SPEED",
            ParamId::KickDecay => "DECAY",
            ParamId::SnareDecay => "OSC_1_DECAY",
            ParamId::ClapDecay => "DECAY",
            ParamId::HatDecay => "DECAY",
            ParamId::FilterType => "FILTER_TYPE",
            ParamId::FilterCutoff => "CUTOFF",
            ParamId::FilterResonance => "RESONANCE",
        }
    }
}

/// Normalized (0.0-1.0) automatable parameter
pub trait Parameter: Send + Sync {
    fn exists(&self) -> bool;
    fn name(&self) -> String;
    fn value(&self) -> f64;
    /// Absolute write, clamped to 0.0-1.0
    fn set(&self, value: f64);
    /// Relative write of `delta / resolution`, clamped to 0.0-1.0
    fn inc(&self, delta: i32, resolution: u32);
}

pub trait Device: Send + Sync {
    fn exists(&self) -> bool;
    /// Existence flag as a watch channel, used as readiness signal
    fn watch_exists(&self) -> watch::Receiver<bool>;
    /// Open the popup browser to replace this device
    fn browse_to_replace(&self);
}

pub trait DrumPad: Send + Sync {
    fn is_muted(&self) -> bool;
    fn is_soloed(&self) -> bool;
    fn toggle_mute(&self);
    fn toggle_solo(&self);
    fn pan(&self) -> Arc<dyn Parameter>;
    fn volume(&self) -> Arc<dyn Parameter>;
    fn send(&self, index: usize) -> Arc<dyn Parameter>;
    /// Insert a device at the end of the pad's chain
    fn insert_device(&self, kind: DeviceKind);
}

pub trait DrumPadBank: Send + Sync {
    /// Pad at `slot` of the visible page (0-7)
    fn pad(&self, slot: usize) -> Arc<dyn DrumPad>;
    fn scroll_page_forwards(&self);
    fn scroll_page_backwards(&self);
    fn clear_muted_pads(&self);
    fn clear_soloed_pads(&self);
}

pub trait ChainSelector: Send + Sync {
    fn active_chain_index(&self) -> usize;
    fn step_active_chain(&self, delta: i32);
    fn select_layer_in_editor(&self, index: usize);
}

pub trait CursorClip: Send + Sync {
    /// Loop length in beats
    fn loop_length(&self) -> f64;
    fn set_loop_length(&self, beats: f64);
    fn scroll_to_step(&self, step: i32);
    fn toggle_step(&self, step: u8, key: u8, velocity: u8);
}

pub trait ClipLauncher: Send + Sync {
    fn set_scroll_position(&self, position: i32);
    fn select(&self, slot: usize);
    fn launch(&self, slot: usize);
    fn has_content(&self, slot: usize) -> bool;
    fn create_empty_clip(&self, slot: usize, beats: u32);
}

pub trait Transport: Send + Sync {
    fn continue_playback(&self);
    fn stop(&self);
    fn toggle_overdub(&self);
    fn toggle_metronome(&self);
    fn is_metronome_enabled(&self) -> bool;
    /// Raw tempo change in BPM
    fn inc_tempo(&self, bpm: f64);
    fn shuffle(&self) -> Arc<dyn Parameter>;
}

pub trait PopupBrowser: Send + Sync {
    fn exists(&self) -> bool;
    /// Device kind of the result under the cursor, if it is a known device
    fn selected_device(&self) -> Option<DeviceKind>;
    fn cancel(&self);
    fn commit(&self);
    fn select_next_file(&self);
    fn select_previous_file(&self);
}

/// Note input of the surface inside the DAW
pub trait NoteInput: Send + Sync {
    fn set_key_translation_table(&self, table: &KeyTable);
    fn set_velocity_translation_table(&self, table: &VelocityTable);
}

/// Change notifications emitted by the DAW
#[derive(Debug, Clone, PartialEq)]
pub enum DawEvent {
    MuteChanged {
        hierarchy: Hierarchy,
        slot: usize,
        muted: bool,
    },
    SoloChanged {
        hierarchy: Hierarchy,
        slot: usize,
        soloed: bool,
    },
    /// Note sounding on the cursor track
    TrackNote { key: u8, on: bool },
    /// Playback position of the cursor clip, in steps
    PlayingStep(i32),
    /// Note content of the cursor clip at `(step, key)`
    NoteStep { step: u8, key: u8, on: bool },
    LoopLength(f64),
    LauncherScrollPosition(i32),
    SlotSelected(usize),
    SlotPlaying(usize),
    MetronomeEnabled(bool),
    Playing(bool),
    OverdubEnabled(bool),
    /// Scroll position of the root drum pad bank (first bank = 36)
    PadBankScrollPosition(i32),
    ActiveChainIndex(usize),
}

/// Pre-bound handles into the DAW
pub trait DawBinding: Send + Sync {
    fn instrument_selector(&self) -> Arc<dyn Device>;
    fn chain_selector(&self) -> Arc<dyn ChainSelector>;
    fn drum_machine(&self, hierarchy: Hierarchy) -> Arc<dyn Device>;
    fn drum_pad_bank(&self, hierarchy: Hierarchy) -> Arc<dyn DrumPadBank>;
    fn pad_device(&self, hierarchy: Hierarchy, slot: usize, kind: DeviceKind) -> Arc<dyn Device>;
    fn device_parameter(
        &self,
        hierarchy: Hierarchy,
        slot: usize,
        id: ParamId,
    ) -> Arc<dyn Parameter>;
    /// Remote control `index` of the sampler's current page
    fn remote_control(&self, hierarchy: Hierarchy, slot: usize, index: usize)
        -> Arc<dyn Parameter>;
    fn track_volume(&self) -> Arc<dyn Parameter>;
    fn transport(&self) -> Arc<dyn Transport>;
    fn cursor_clip(&self) -> Arc<dyn CursorClip>;
    fn clip_launcher(&self) -> Arc<dyn ClipLauncher>;
    fn popup_browser(&self) -> Arc<dyn PopupBrowser>;
    fn note_input(&self) -> Arc<dyn NoteInput>;
    /// Event stream; current observable values are replayed first
    fn subscribe(&self) -> mpsc::UnboundedReceiver<DawEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy_from_selector() {
        assert_eq!(Hierarchy::from_selector(true), Hierarchy::Nested);
        assert_eq!(Hierarchy::from_selector(false), Hierarchy::Root);
    }

    #[test]
    fn test_param_owner_devices() {
        assert_eq!(ParamId::SnareDecay.device(), DeviceKind::Snare);
        assert_eq!(ParamId::SnareDecay.key(), "OSC_1_DECAY");
        assert_eq!(ParamId::SamplerSpeed.device(), DeviceKind::Sampler);
        assert_eq!(ParamId::FilterCutoff.device(), DeviceKind::Filter);
    }
}
