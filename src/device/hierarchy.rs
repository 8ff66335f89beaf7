//! Root and nested drum machine hierarchies
//!
//! Both hierarchies are bound once at startup: every pad slot gets its
//! device probes and parameters pre-bound, so resolving a target at event
//! time is a handful of existence checks.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::daw::{
    DawBinding, Device, DeviceKind, DrumPad, DrumPadBank, Hierarchy, ParamId, Parameter,
};
use crate::state::PAD_BANK_SIZE;

use super::decay::RELEASE_CONTROL_INDEX;

/// Pre-bound handles of one pad slot
pub struct PadProbes {
    pub pad: Arc<dyn DrumPad>,
    devices: BTreeMap<DeviceKind, Arc<dyn Device>>,
    params: BTreeMap<ParamId, Arc<dyn Parameter>>,
    /// Remote control that may act as the sampler release
    pub release: Arc<dyn Parameter>,
}

impl PadProbes {
    fn bind(daw: &dyn DawBinding, bank: &dyn DrumPadBank, hierarchy: Hierarchy, slot: usize) -> Self {
        Self {
            pad: bank.pad(slot),
            devices: DeviceKind::ALL
                .iter()
                .map(|&kind| (kind, daw.pad_device(hierarchy, slot, kind)))
                .collect(),
            params: ParamId::ALL
                .iter()
                .map(|&id| (id, daw.device_parameter(hierarchy, slot, id)))
                .collect(),
            release: daw.remote_control(hierarchy, slot, RELEASE_CONTROL_INDEX),
        }
    }

    pub fn device(&self, kind: DeviceKind) -> &Arc<dyn Device> {
        &self.devices[&kind]
    }

    pub fn param(&self, id: ParamId) -> &Arc<dyn Parameter> {
        &self.params[&id]
    }
}

/// Drum machine with its pad bank and per-slot probes
pub struct DrumRack {
    pub drum_machine: Arc<dyn Device>,
    pub bank: Arc<dyn DrumPadBank>,
    pads: Vec<PadProbes>,
}

impl DrumRack {
    pub fn bind(daw: &dyn DawBinding, hierarchy: Hierarchy) -> Self {
        let bank = daw.drum_pad_bank(hierarchy);
        let pads = (0..PAD_BANK_SIZE)
            .map(|slot| PadProbes::bind(daw, bank.as_ref(), hierarchy, slot))
            .collect();

        Self {
            drum_machine: daw.drum_machine(hierarchy),
            bank,
            pads,
        }
    }

    pub fn probes(&self, slot: usize) -> &PadProbes {
        &self.pads[slot % PAD_BANK_SIZE]
    }
}

/// Uniform view over the root and nested drum machines
pub trait DeviceHierarchy: Send + Sync {
    fn kind(&self) -> Hierarchy;

    fn rack(&self) -> &DrumRack;

    fn probes(&self, slot: usize) -> &PadProbes {
        self.rack().probes(slot)
    }
}

/// Drum machine sitting directly on the track
pub struct RootHierarchy {
    rack: DrumRack,
}

impl RootHierarchy {
    pub fn bind(daw: &dyn DawBinding) -> Self {
        Self {
            rack: DrumRack::bind(daw, Hierarchy::Root),
        }
    }
}

impl DeviceHierarchy for RootHierarchy {
    fn kind(&self) -> Hierarchy {
        Hierarchy::Root
    }

    fn rack(&self) -> &DrumRack {
        &self.rack
    }
}

/// Drum machine in the selected chain of the instrument selector
pub struct NestedHierarchy {
    rack: DrumRack,
}

impl NestedHierarchy {
    pub fn bind(daw: &dyn DawBinding) -> Self {
        Self {
            rack: DrumRack::bind(daw, Hierarchy::Nested),
        }
    }
}

impl DeviceHierarchy for NestedHierarchy {
    fn kind(&self) -> Hierarchy {
        Hierarchy::Nested
    }

    fn rack(&self) -> &DrumRack {
        &self.rack
    }
}
