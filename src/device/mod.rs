//! Device and parameter resolution
//!
//! The same knob or button targets a different device depending on the
//! selected pad and on which drum machine is active. [`DeviceResolver`]
//! picks the active [`DeviceHierarchy`] on every call (nested whenever an
//! instrument selector exists) and exposes uniform per-pad operations.
//! Absent targets are silently skipped.

pub mod decay;
pub mod hierarchy;
pub mod provisioning;

pub use decay::{route_decay, DecayRoute, DECAY_PRIORITY};
pub use hierarchy::{DeviceHierarchy, DrumRack, NestedHierarchy, PadProbes, RootHierarchy};
pub use provisioning::wait_until_exists;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::daw::{
    DawBinding, Device, DeviceKind, DrumPad, DrumPadBank, Hierarchy, ParamId, Parameter,
};
use crate::state::ModeState;
use crate::surface::layout::encoder;

/// Relative resolution of pan and volume knobs
pub const MIXER_RESOLUTION: u32 = 128;
/// Relative resolution of sends, decay and filter knobs
pub const FINE_RESOLUTION: u32 = 64;

/// Semitone to sampler speed, -8..=+7
const SAMPLER_SPEED_MAP: [(i32, f64); 16] = [
    (-8, 0.57875),
    (-7, 0.583425),
    (-6, 0.5883875),
    (-5, 0.59365),
    (-4, 0.5992125),
    (-3, 0.6051125),
    (-2, 0.6113625),
    (-1, 0.6179875),
    (0, 0.625),
    (1, 0.6324375),
    (2, 0.6403125),
    (3, 0.64865),
    (4, 0.6574875),
    (5, 0.66685),
    (6, 0.676775),
    (7, 0.6872875),
];

/// Normalized sampler speed for a transposition in semitones
pub fn sampler_speed(semitone: i32) -> Option<f64> {
    SAMPLER_SPEED_MAP
        .iter()
        .find(|(s, _)| *s == semitone)
        .map(|&(_, speed)| speed)
}

/// Instrument probes in the order the pad's instrument is looked up
pub const INSTRUMENT_KINDS: [DeviceKind; 5] = [
    DeviceKind::Sampler,
    DeviceKind::Kick,
    DeviceKind::Snare,
    DeviceKind::Clap,
    DeviceKind::Hat,
];

/// Filter presets applied by the filter type knob
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterPreset {
    pub filter_type: f64,
    pub cutoff: f64,
    pub resonance: f64,
}

pub const LOWPASS: FilterPreset = FilterPreset {
    filter_type: 0.0,
    cutoff: 1.0,
    resonance: 0.3,
};

pub const HIGHPASS: FilterPreset = FilterPreset {
    filter_type: 0.5,
    cutoff: 0.0,
    resonance: 0.3,
};

const FILTER_DEFAULT_CUTOFF: f64 = 1.0;
const FILTER_DEFAULT_RESONANCE: f64 = 0.3;
/// ADSR mode
const SAMPLER_DEFAULT_MODE: f64 = 0.0;
const SAMPLER_DEFAULT_SUSTAIN: f64 = 0.0;

fn nudge(param: &dyn Parameter, value: u8, resolution: u32) {
    if param.exists() {
        param.inc(encoder::delta(value), resolution);
    }
}

fn assign(param: &dyn Parameter, value: f64) {
    if param.exists() {
        param.set(value);
    }
}

pub struct DeviceResolver {
    state: Arc<ModeState>,
    instrument_selector: Arc<dyn Device>,
    root: RootHierarchy,
    nested: NestedHierarchy,
    settle_timeout: Duration,
}

impl DeviceResolver {
    pub fn new(daw: &dyn DawBinding, state: Arc<ModeState>, settle_timeout: Duration) -> Self {
        Self {
            state,
            instrument_selector: daw.instrument_selector(),
            root: RootHierarchy::bind(daw),
            nested: NestedHierarchy::bind(daw),
            settle_timeout,
        }
    }

    /// Active hierarchy, re-evaluated on every call
    pub fn hierarchy(&self) -> Hierarchy {
        Hierarchy::from_selector(self.instrument_selector.exists())
    }

    fn select(&self, hierarchy: Hierarchy) -> &dyn DeviceHierarchy {
        match hierarchy {
            Hierarchy::Root => &self.root,
            Hierarchy::Nested => &self.nested,
        }
    }

    pub fn active(&self) -> &dyn DeviceHierarchy {
        self.select(self.hierarchy())
    }

    fn selected_probes(&self) -> &PadProbes {
        self.active().probes(self.state.selected_slot())
    }

    pub fn resolve_bank(&self) -> Arc<dyn DrumPadBank> {
        self.active().rack().bank.clone()
    }

    pub fn resolve_drum_machine(&self) -> Arc<dyn Device> {
        self.active().rack().drum_machine.clone()
    }

    /// Drum pad of the selected slot
    pub fn resolve_pad(&self) -> Arc<dyn DrumPad> {
        self.selected_probes().pad.clone()
    }

    /// Device probe of the selected slot
    pub fn resolve_device(&self, kind: DeviceKind) -> Arc<dyn Device> {
        self.selected_probes().device(kind).clone()
    }

    /// First instrument present on the selected pad
    pub fn resolve_instrument(&self) -> Option<Arc<dyn Device>> {
        let probes = self.selected_probes();
        INSTRUMENT_KINDS
            .iter()
            .map(|&kind| probes.device(kind))
            .find(|device| device.exists())
            .cloned()
    }

    pub fn resolve_parameter(&self, id: ParamId) -> Arc<dyn Parameter> {
        self.selected_probes().param(id).clone()
    }

    pub fn set_pan(&self, value: u8) {
        nudge(self.resolve_pad().pan().as_ref(), value, MIXER_RESOLUTION);
    }

    pub fn set_volume(&self, value: u8) {
        nudge(self.resolve_pad().volume().as_ref(), value, MIXER_RESOLUTION);
    }

    pub fn set_send_level(&self, index: usize, value: u8) {
        nudge(self.resolve_pad().send(index).as_ref(), value, FINE_RESOLUTION);
    }

    pub fn set_decay(&self, value: u8) {
        route_decay(self.selected_probes()).apply(encoder::delta(value), FINE_RESOLUTION);
    }

    /// Transpose the selected pad's sampler; unknown semitones are ignored
    pub fn set_sampler_transposition(&self, semitone: i32) {
        let Some(speed) = sampler_speed(semitone) else {
            return;
        };
        debug!(semitone, speed, pad = self.state.selected_slot(), "Sampler transposition");
        assign(self.resolve_parameter(ParamId::SamplerSpeed).as_ref(), speed);
    }

    /// Minus selects the lowpass preset, plus the highpass preset
    pub fn set_filter_type(&self, value: u8) {
        let preset = match value {
            encoder::MINUS => LOWPASS,
            encoder::PLUS => HIGHPASS,
            _ => return,
        };
        self.apply_filter_preset(self.selected_probes(), preset);
    }

    pub fn set_filter_cutoff(&self, value: u8) {
        nudge(self.resolve_parameter(ParamId::FilterCutoff).as_ref(), value, FINE_RESOLUTION);
    }

    pub fn set_filter_resonance(&self, value: u8) {
        nudge(
            self.resolve_parameter(ParamId::FilterResonance).as_ref(),
            value,
            FINE_RESOLUTION,
        );
    }

    fn apply_filter_preset(&self, probes: &PadProbes, preset: FilterPreset) {
        trace!(?preset, "Filter preset");
        assign(probes.param(ParamId::FilterType).as_ref(), preset.filter_type);
        assign(probes.param(ParamId::FilterCutoff).as_ref(), preset.cutoff);
        assign(probes.param(ParamId::FilterResonance).as_ref(), preset.resonance);
    }

    /// Scroll both drum pad banks to the lower or upper page
    pub fn switch_drum_pad_bank(&self, switched: bool) {
        for hierarchy in Hierarchy::ALL {
            let bank = &self.select(hierarchy).rack().bank;
            if switched {
                bank.scroll_page_forwards();
            } else {
                bank.scroll_page_backwards();
            }
        }
    }

    pub fn filter_exists(&self) -> bool {
        self.resolve_device(DeviceKind::Filter).exists()
    }

    /// Sampler defaults (ADSR mode, no sustain) once the sampler is addressable
    ///
    /// The target pad and hierarchy are captured before waiting, so a pad
    /// change during the wait does not redirect the write.
    pub async fn apply_sampler_defaults(&self) -> bool {
        let hierarchy = self.hierarchy();
        let slot = self.state.selected_slot();
        let probes = self.select(hierarchy).probes(slot);

        let ready =
            wait_until_exists(probes.device(DeviceKind::Sampler).as_ref(), self.settle_timeout)
                .await;
        debug!(%hierarchy, slot, ready, "Applying sampler defaults");
        assign(probes.param(ParamId::SamplerMode).as_ref(), SAMPLER_DEFAULT_MODE);
        assign(probes.param(ParamId::SamplerSustain).as_ref(), SAMPLER_DEFAULT_SUSTAIN);
        ready
    }

    /// Filter defaults (cutoff open, light resonance) once the filter is addressable
    pub async fn apply_filter_defaults(&self) -> bool {
        let hierarchy = self.hierarchy();
        let slot = self.state.selected_slot();
        let probes = self.select(hierarchy).probes(slot);

        let ready =
            wait_until_exists(probes.device(DeviceKind::Filter).as_ref(), self.settle_timeout)
                .await;
        debug!(%hierarchy, slot, ready, "Applying filter defaults");
        assign(probes.param(ParamId::FilterCutoff).as_ref(), FILTER_DEFAULT_CUTOFF);
        assign(probes.param(ParamId::FilterResonance).as_ref(), FILTER_DEFAULT_RESONANCE);
        ready
    }

    /// Insert a sampler on the selected pad and apply its defaults
    pub async fn provision_sampler(&self) -> bool {
        debug!(hierarchy = %self.hierarchy(), pad = self.state.selected_slot(), "Provisioning sampler");
        self.resolve_pad().insert_device(DeviceKind::Sampler);
        self.apply_sampler_defaults().await
    }

    /// Insert a filter on the selected pad unless one is there
    pub async fn provision_filter(&self) {
        if self.filter_exists() {
            return;
        }
        debug!(hierarchy = %self.hierarchy(), pad = self.state.selected_slot(), "Provisioning filter");
        self.resolve_pad().insert_device(DeviceKind::Filter);
        self.apply_filter_defaults().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daw::memory::MemoryDaw;

    fn setup(delay: Duration) -> (Arc<MemoryDaw>, Arc<ModeState>, DeviceResolver) {
        let daw = Arc::new(MemoryDaw::with_insert_delay(delay));
        let state = Arc::new(ModeState::new());
        let resolver = DeviceResolver::new(daw.as_ref(), state.clone(), Duration::from_millis(200));
        (daw, state, resolver)
    }

    #[test]
    fn test_sampler_speed_map() {
        assert_eq!(sampler_speed(0), Some(0.625));
        assert_eq!(sampler_speed(-8), Some(0.57875));
        assert_eq!(sampler_speed(7), Some(0.6872875));
        assert_eq!(sampler_speed(8), None);
    }

    #[test]
    fn test_hierarchy_follows_instrument_selector() {
        let (daw, _state, resolver) = setup(Duration::ZERO);
        assert_eq!(resolver.hierarchy(), Hierarchy::Root);
        assert_eq!(resolver.active().kind(), Hierarchy::Root);

        daw.set_instrument_selector(true);
        assert_eq!(resolver.active().kind(), Hierarchy::Nested);
    }

    #[test]
    fn test_pan_targets_selected_pad_of_active_hierarchy() {
        let (daw, state, resolver) = setup(Duration::ZERO);
        daw.set_instrument_selector(true);
        resolver.switch_drum_pad_bank(true);
        state.select_pad(10);

        resolver.set_pan(65);
        let pan = daw.pad(Hierarchy::Nested, 10).pan_parameter();
        assert_eq!(pan.value(), 0.5 + 1.0 / 128.0);
        assert_eq!(daw.pad(Hierarchy::Nested, 2).pan_parameter().write_count(), 0);
        assert_eq!(daw.pad(Hierarchy::Root, 10).pan_parameter().write_count(), 0);
    }

    #[test]
    fn test_instrument_lookup_order() {
        let (daw, state, resolver) = setup(Duration::ZERO);
        state.select_pad(4);
        assert!(resolver.resolve_instrument().is_none());

        daw.device(Hierarchy::Root, 4, DeviceKind::Clap).set_exists(true);
        assert!(resolver.resolve_instrument().is_some());

        daw.device(Hierarchy::Root, 4, DeviceKind::Clap).set_exists(false);
        daw.device(Hierarchy::Nested, 4, DeviceKind::Sampler).set_exists(true);
        assert!(resolver.resolve_instrument().is_none());
        daw.set_instrument_selector(true);
        assert!(resolver.resolve_instrument().is_some());
    }

    #[test]
    fn test_filter_type_presets() {
        let (daw, _state, resolver) = setup(Duration::ZERO);
        daw.device(Hierarchy::Root, 0, DeviceKind::Filter).set_exists(true);

        resolver.set_filter_type(encoder::PLUS);
        let value = |id| daw.parameter(Hierarchy::Root, 0, id).value();
        assert_eq!(value(ParamId::FilterType), 0.5);
        assert_eq!(value(ParamId::FilterCutoff), 0.0);
        assert_eq!(value(ParamId::FilterResonance), 0.3);

        resolver.set_filter_type(encoder::MINUS);
        assert_eq!(value(ParamId::FilterType), 0.0);
        assert_eq!(value(ParamId::FilterCutoff), 1.0);
    }

    #[test]
    fn test_absent_filter_is_noop() {
        let (daw, _state, resolver) = setup(Duration::ZERO);
        resolver.set_filter_type(encoder::MINUS);
        resolver.set_filter_cutoff(70);
        assert_eq!(daw.parameter(Hierarchy::Root, 0, ParamId::FilterType).write_count(), 0);
        assert_eq!(daw.parameter(Hierarchy::Root, 0, ParamId::FilterCutoff).write_count(), 0);
    }

    #[test]
    fn test_switch_scrolls_both_banks() {
        let (daw, _state, resolver) = setup(Duration::ZERO);
        resolver.switch_drum_pad_bank(true);
        assert_eq!(daw.bank(Hierarchy::Root).scroll_position(), 44);
        assert_eq!(daw.bank(Hierarchy::Nested).scroll_position(), 44);
        resolver.switch_drum_pad_bank(false);
        assert_eq!(daw.bank(Hierarchy::Root).scroll_position(), 36);
    }

    #[tokio::test]
    async fn test_provision_sampler_waits_for_readiness() {
        let (daw, state, resolver) = setup(Duration::from_millis(30));
        state.select_pad(5);

        assert!(resolver.provision_sampler().await);
        assert_eq!(daw.parameter(Hierarchy::Root, 5, ParamId::SamplerMode).value(), 0.0);
        assert_eq!(daw.parameter(Hierarchy::Root, 5, ParamId::SamplerSustain).value(), 0.0);
    }

    #[tokio::test]
    async fn test_defaults_keep_captured_pad() {
        let (daw, state, resolver) = setup(Duration::from_millis(30));
        state.select_pad(1);
        let provisioning = resolver.provision_sampler();
        tokio::pin!(provisioning);

        // Let the insert start, then move the selection
        let _ = tokio::time::timeout(Duration::from_millis(5), &mut provisioning).await;
        state.select_pad(2);
        assert!(provisioning.await);

        assert_eq!(daw.parameter(Hierarchy::Root, 1, ParamId::SamplerSustain).value(), 0.0);
        assert_eq!(daw.parameter(Hierarchy::Root, 2, ParamId::SamplerSustain).write_count(), 0);
    }

    #[tokio::test]
    async fn test_provision_filter_skips_existing() {
        let (daw, _state, resolver) = setup(Duration::ZERO);
        daw.device(Hierarchy::Root, 0, DeviceKind::Filter).set_exists(true);
        resolver.provision_filter().await;
        assert_eq!(daw.parameter(Hierarchy::Root, 0, ParamId::FilterCutoff).write_count(), 0);
    }

    #[tokio::test]
    async fn test_provision_filter_inserts_with_defaults() {
        let (daw, state, resolver) = setup(Duration::ZERO);
        state.select_pad(3);
        resolver.provision_filter().await;

        assert!(daw.device(Hierarchy::Root, 3, DeviceKind::Filter).exists());
        assert_eq!(daw.parameter(Hierarchy::Root, 3, ParamId::FilterCutoff).value(), 1.0);
        assert_eq!(daw.parameter(Hierarchy::Root, 3, ParamId::FilterResonance).value(), 0.3);
    }
}
