//! Mode type definitions
//!
//! Enumerations held by the mode state cells.

use std::fmt;

/// What a pad press does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PadsMode {
    /// Pads trigger drum notes
    #[default]
    Play,
    /// Pads toggle the mute flag of their drum pad
    Mute,
    /// Pads toggle the solo flag of their drum pad
    Solo,
}

/// What a step press does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StepsMode {
    /// Steps select the clip launcher bank
    #[default]
    Bank,
    /// Steps select and launch patterns (clips)
    Pattern,
    /// Steps toggle notes of the selected pad
    Sequencer,
    /// Steps transpose the selected pad's sampler
    Tune,
}

/// What the three assignable knobs control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParameterBank {
    /// Filter type, resonance, cutoff
    Filter,
    /// Send levels 1-3
    Sends,
    /// Pan, volume, decay
    #[default]
    PanLevel,
}

impl fmt::Display for PadsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PadsMode::Play => write!(f, "play"),
            PadsMode::Mute => write!(f, "mute"),
            PadsMode::Solo => write!(f, "solo"),
        }
    }
}

impl fmt::Display for StepsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepsMode::Bank => write!(f, "bank"),
            StepsMode::Pattern => write!(f, "pattern"),
            StepsMode::Sequencer => write!(f, "sequencer"),
            StepsMode::Tune => write!(f, "tune"),
        }
    }
}

impl fmt::Display for ParameterBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterBank::Filter => write!(f, "filter"),
            ParameterBank::Sends => write!(f, "sends"),
            ParameterBank::PanLevel => write!(f, "pan/level"),
        }
    }
}
