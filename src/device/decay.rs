//! Decay routing
//!
//! The decay knob drives the first synth found on the pad, in priority
//! order, and falls back to the sampler envelope. A sampler whose remote
//! control page exposes a "Release" or "Decay" macro at index 3 gets the
//! same delta written there too.

use std::sync::Arc;

use tracing::trace;

use super::hierarchy::PadProbes;
use crate::daw::{DeviceKind, ParamId, Parameter};

/// Synth decay parameters, highest priority first
pub const DECAY_PRIORITY: [(DeviceKind, ParamId); 4] = [
    (DeviceKind::Kick, ParamId::KickDecay),
    (DeviceKind::Snare, ParamId::SnareDecay),
    (DeviceKind::Clap, ParamId::ClapDecay),
    (DeviceKind::Hat, ParamId::HatDecay),
];

/// Remote control slot checked for a release macro
pub const RELEASE_CONTROL_INDEX: usize = 3;

const RELEASE_NAMES: [&str; 2] = ["Release", "Decay"];

/// Where a decay change lands
pub struct DecayRoute {
    pub source: DeviceKind,
    pub primary: Arc<dyn Parameter>,
    /// Release macro written alongside the primary target
    pub secondary: Option<Arc<dyn Parameter>>,
}

impl DecayRoute {
    pub fn apply(&self, delta: i32, resolution: u32) {
        trace!(source = %self.source, delta, dual = self.secondary.is_some(), "Decay");
        if self.primary.exists() {
            self.primary.inc(delta, resolution);
        }
        if let Some(secondary) = &self.secondary {
            secondary.inc(delta, resolution);
        }
    }
}

pub fn route_decay(probes: &PadProbes) -> DecayRoute {
    let (source, primary) = DECAY_PRIORITY
        .iter()
        .map(|&(kind, id)| (kind, probes.param(id)))
        .find(|(_, param)| param.exists())
        .unwrap_or((DeviceKind::Sampler, probes.param(ParamId::SamplerDecay)));

    let release = &probes.release;
    let secondary = (release.exists() && RELEASE_NAMES.contains(&release.name().as_str()))
        .then(|| release.clone());

    DecayRoute {
        source,
        primary: primary.clone(),
        secondary,
    }
}
