//! In-memory DAW binding
//!
//! A self-contained model of one track holding a drum machine (and,
//! optionally, an instrument selector with a nested drum machine). Used
//! by the standalone binary and as the test double of the router.
//! Device insertion can be delayed to exercise the readiness handling.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::{
    ChainSelector, ClipLauncher, CursorClip, DawBinding, DawEvent, Device, DeviceKind, DrumPad,
    DrumPadBank, Hierarchy, NoteInput, ParamId, Parameter, PopupBrowser, Transport,
};
use crate::bus::EventBus;
use crate::translation::{KeyTable, VelocityTable};

const PADS_PER_BANK: usize = 8;
/// Pads per drum machine: two pages
const PADS_PER_RACK: usize = 16;
const SEND_COUNT: usize = 3;
const REMOTE_CONTROLS_PER_PAGE: usize = 8;
const FIRST_PAD_BANK_POSITION: i32 = 36;
const INSTRUMENT_SELECTOR_CHAINS: usize = 4;

type Bus = Arc<EventBus<DawEvent>>;

// ---------------------------------------------------------------------------
// Parameters and devices
// ---------------------------------------------------------------------------

/// Normalized parameter, present only while its owning device exists
pub struct MemoryParameter {
    name: Mutex<String>,
    value: Mutex<f64>,
    owner: Option<watch::Receiver<bool>>,
    writes: AtomicUsize,
}

impl MemoryParameter {
    /// Always-present parameter (track and mixer controls)
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: Mutex::new(name.into()),
            value: Mutex::new(value),
            owner: None,
            writes: AtomicUsize::new(0),
        }
    }

    /// Parameter of a device; absent while the device is absent
    pub fn owned_by(name: impl Into<String>, value: f64, owner: &MemoryDevice) -> Self {
        Self {
            owner: Some(owner.exists.subscribe()),
            ..Self::new(name, value)
        }
    }

    /// Parameter that never exists
    pub fn missing(name: impl Into<String>) -> Self {
        let (_tx, rx) = watch::channel(false);
        Self {
            owner: Some(rx),
            ..Self::new(name, 0.0)
        }
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.lock() = name.into();
    }

    /// Number of accepted writes
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn write(&self, value: f64) {
        *self.value.lock() = value.clamp(0.0, 1.0);
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl Parameter for MemoryParameter {
    fn exists(&self) -> bool {
        self.owner.as_ref().map_or(true, |rx| *rx.borrow())
    }

    fn name(&self) -> String {
        self.name.lock().clone()
    }

    fn value(&self) -> f64 {
        *self.value.lock()
    }

    fn set(&self, value: f64) {
        if self.exists() {
            self.write(value);
        }
    }

    fn inc(&self, delta: i32, resolution: u32) {
        if !self.exists() || resolution == 0 {
            return;
        }
        let step = f64::from(delta) / f64::from(resolution);
        self.write(self.value() + step);
    }
}

/// Device slot whose existence is observable
pub struct MemoryDevice {
    label: String,
    /// Pad device kind; `None` for track level devices
    kind: Option<DeviceKind>,
    exists: watch::Sender<bool>,
    browser: Arc<MemoryBrowser>,
}

impl MemoryDevice {
    fn new(
        label: impl Into<String>,
        kind: Option<DeviceKind>,
        exists: bool,
        browser: Arc<MemoryBrowser>,
    ) -> Self {
        let (tx, _rx) = watch::channel(exists);
        Self {
            label: label.into(),
            kind,
            exists: tx,
            browser,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_exists(&self, exists: bool) {
        self.exists.send_replace(exists);
    }
}

impl Device for MemoryDevice {
    fn exists(&self) -> bool {
        *self.exists.borrow()
    }

    fn watch_exists(&self) -> watch::Receiver<bool> {
        self.exists.subscribe()
    }

    fn browse_to_replace(&self) {
        self.browser.open(&self.label, self.kind);
    }
}

// ---------------------------------------------------------------------------
// Drum pads
// ---------------------------------------------------------------------------

/// One pad of a drum machine, addressed by its absolute index (0-15)
pub struct MemoryPad {
    hierarchy: Hierarchy,
    index: usize,
    scroll: Arc<AtomicI32>,
    muted: AtomicBool,
    soloed: AtomicBool,
    pan: Arc<MemoryParameter>,
    volume: Arc<MemoryParameter>,
    sends: Vec<Arc<MemoryParameter>>,
    devices: BTreeMap<DeviceKind, Arc<MemoryDevice>>,
    params: BTreeMap<ParamId, Arc<MemoryParameter>>,
    remote_controls: Vec<Arc<MemoryParameter>>,
    insert_delay: Duration,
    bus: Bus,
}

impl MemoryPad {
    fn new(
        hierarchy: Hierarchy,
        index: usize,
        scroll: Arc<AtomicI32>,
        insert_delay: Duration,
        browser: &Arc<MemoryBrowser>,
        bus: Bus,
    ) -> Self {
        let devices: BTreeMap<_, _> = DeviceKind::ALL
            .iter()
            .map(|&kind| {
                let label = format!("{} {} pad {}", hierarchy, kind, index);
                (kind, Arc::new(MemoryDevice::new(label, Some(kind), false, browser.clone())))
            })
            .collect();

        let params = ParamId::ALL
            .iter()
            .map(|&id| {
                let owner = &devices[&id.device()];
                (id, Arc::new(MemoryParameter::owned_by(id.key(), 0.5, owner)))
            })
            .collect();

        let sampler = &devices[&DeviceKind::Sampler];
        let remote_controls = (0..REMOTE_CONTROLS_PER_PAGE)
            .map(|i| Arc::new(MemoryParameter::owned_by(format!("Macro {}", i + 1), 0.5, sampler)))
            .collect();

        Self {
            hierarchy,
            index,
            scroll,
            muted: AtomicBool::new(false),
            soloed: AtomicBool::new(false),
            pan: Arc::new(MemoryParameter::new("Pan", 0.5)),
            volume: Arc::new(MemoryParameter::new("Volume", 0.5)),
            sends: (0..SEND_COUNT)
                .map(|i| Arc::new(MemoryParameter::new(format!("Send {}", i + 1), 0.0)))
                .collect(),
            devices,
            params,
            remote_controls,
            insert_delay,
            bus,
        }
    }

    /// Slot on the visible page, if the pad is on it
    fn visible_slot(&self) -> Option<usize> {
        let first = first_visible_pad(&self.scroll);
        self.index
            .checked_sub(first)
            .filter(|&slot| slot < PADS_PER_BANK)
    }

    /// Externally driven mute change (as if edited in the DAW)
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
        if let Some(slot) = self.visible_slot() {
            self.publish_mute(slot);
        }
    }

    pub fn set_soloed(&self, soloed: bool) {
        self.soloed.store(soloed, Ordering::SeqCst);
        if let Some(slot) = self.visible_slot() {
            self.publish_solo(slot);
        }
    }

    fn publish_mute(&self, slot: usize) {
        self.bus.publish(DawEvent::MuteChanged {
            hierarchy: self.hierarchy,
            slot,
            muted: self.is_muted(),
        });
    }

    fn publish_solo(&self, slot: usize) {
        self.bus.publish(DawEvent::SoloChanged {
            hierarchy: self.hierarchy,
            slot,
            soloed: self.is_soloed(),
        });
    }

    pub fn device(&self, kind: DeviceKind) -> Arc<MemoryDevice> {
        self.devices[&kind].clone()
    }

    pub fn parameter(&self, id: ParamId) -> Arc<MemoryParameter> {
        self.params[&id].clone()
    }

    pub fn pan_parameter(&self) -> Arc<MemoryParameter> {
        self.pan.clone()
    }

    pub fn volume_parameter(&self) -> Arc<MemoryParameter> {
        self.volume.clone()
    }

    pub fn send_parameter(&self, index: usize) -> Option<Arc<MemoryParameter>> {
        self.sends.get(index).cloned()
    }

    pub fn remote_control(&self, index: usize) -> Arc<MemoryParameter> {
        match self.remote_controls.get(index) {
            Some(param) => param.clone(),
            None => Arc::new(MemoryParameter::missing(format!("Macro {}", index + 1))),
        }
    }
}

impl DrumPad for MemoryPad {
    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    fn is_soloed(&self) -> bool {
        self.soloed.load(Ordering::SeqCst)
    }

    fn toggle_mute(&self) {
        self.set_muted(!self.is_muted());
    }

    fn toggle_solo(&self) {
        self.set_soloed(!self.is_soloed());
    }

    fn pan(&self) -> Arc<dyn Parameter> {
        self.pan.clone()
    }

    fn volume(&self) -> Arc<dyn Parameter> {
        self.volume.clone()
    }

    fn send(&self, index: usize) -> Arc<dyn Parameter> {
        match self.sends.get(index) {
            Some(param) => param.clone(),
            None => Arc::new(MemoryParameter::missing(format!("Send {}", index + 1))),
        }
    }

    fn insert_device(&self, kind: DeviceKind) {
        let device = self.device(kind);
        debug!(hierarchy = %self.hierarchy, pad = self.index, %kind, "Inserting device");

        let runtime = tokio::runtime::Handle::try_current();
        match runtime {
            Ok(handle) if !self.insert_delay.is_zero() => {
                let delay = self.insert_delay;
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    device.set_exists(true);
                });
            }
            _ => device.set_exists(true),
        }
    }
}

fn first_visible_pad(scroll: &AtomicI32) -> usize {
    usize::try_from(scroll.load(Ordering::SeqCst) - FIRST_PAD_BANK_POSITION).unwrap_or(0)
}

/// Window of `PADS_PER_BANK` pads following the bank scroll position
#[derive(Clone)]
struct PadPage {
    pads: Arc<Vec<Arc<MemoryPad>>>,
    scroll: Arc<AtomicI32>,
}

impl PadPage {
    fn at(&self, slot: usize) -> Arc<MemoryPad> {
        self.pads[(first_visible_pad(&self.scroll) + slot) % PADS_PER_RACK].clone()
    }
}

pub struct MemoryDrumPadBank {
    hierarchy: Hierarchy,
    page: PadPage,
    bus: Bus,
}

impl MemoryDrumPadBank {
    pub fn scroll_position(&self) -> i32 {
        self.page.scroll.load(Ordering::SeqCst)
    }

    /// Pad by absolute index, whatever page is visible
    pub fn memory_pad(&self, index: usize) -> Arc<MemoryPad> {
        self.page.pads[index % PADS_PER_RACK].clone()
    }

    /// The modeled drum machine has two pages (36..43 and 44..51)
    fn scroll_by(&self, delta: i32) {
        let last = FIRST_PAD_BANK_POSITION + (PADS_PER_RACK - PADS_PER_BANK) as i32;
        let previous = self.scroll_position();
        let position = (previous + delta).clamp(FIRST_PAD_BANK_POSITION, last);
        if position == previous {
            return;
        }
        self.page.scroll.store(position, Ordering::SeqCst);
        if self.hierarchy == Hierarchy::Root {
            self.bus.publish(DawEvent::PadBankScrollPosition(position));
        }

        // Slot observers report the flags of the pads now under them
        for slot in 0..PADS_PER_BANK {
            let pad = self.page.at(slot);
            pad.publish_mute(slot);
            pad.publish_solo(slot);
        }
    }
}

impl DrumPadBank for MemoryDrumPadBank {
    fn pad(&self, slot: usize) -> Arc<dyn DrumPad> {
        Arc::new(PagePad {
            page: self.page.clone(),
            slot,
        })
    }

    fn scroll_page_forwards(&self) {
        self.scroll_by(PADS_PER_BANK as i32);
    }

    fn scroll_page_backwards(&self) {
        self.scroll_by(-(PADS_PER_BANK as i32));
    }

    fn clear_muted_pads(&self) {
        for pad in self.page.pads.iter() {
            if pad.is_muted() {
                pad.set_muted(false);
            }
        }
    }

    fn clear_soloed_pads(&self) {
        for pad in self.page.pads.iter() {
            if pad.is_soloed() {
                pad.set_soloed(false);
            }
        }
    }
}

// Slot-bound handles. Each one resolves to the pad currently shown at its
// slot, so a bank scroll retargets every handle bound at startup.

struct PagePad {
    page: PadPage,
    slot: usize,
}

impl DrumPad for PagePad {
    fn is_muted(&self) -> bool {
        self.page.at(self.slot).is_muted()
    }

    fn is_soloed(&self) -> bool {
        self.page.at(self.slot).is_soloed()
    }

    fn toggle_mute(&self) {
        self.page.at(self.slot).toggle_mute();
    }

    fn toggle_solo(&self) {
        self.page.at(self.slot).toggle_solo();
    }

    fn pan(&self) -> Arc<dyn Parameter> {
        self.page.at(self.slot).pan()
    }

    fn volume(&self) -> Arc<dyn Parameter> {
        self.page.at(self.slot).volume()
    }

    fn send(&self, index: usize) -> Arc<dyn Parameter> {
        self.page.at(self.slot).send(index)
    }

    fn insert_device(&self, kind: DeviceKind) {
        self.page.at(self.slot).insert_device(kind);
    }
}

struct PageDevice {
    page: PadPage,
    slot: usize,
    kind: DeviceKind,
}

impl PageDevice {
    fn current(&self) -> Arc<MemoryDevice> {
        self.page.at(self.slot).device(self.kind)
    }
}

impl Device for PageDevice {
    fn exists(&self) -> bool {
        self.current().exists()
    }

    fn watch_exists(&self) -> watch::Receiver<bool> {
        self.current().watch_exists()
    }

    fn browse_to_replace(&self) {
        self.current().browse_to_replace();
    }
}

#[derive(Clone, Copy)]
enum PageParamTarget {
    Device(ParamId),
    RemoteControl(usize),
}

struct PageParameter {
    page: PadPage,
    slot: usize,
    target: PageParamTarget,
}

impl PageParameter {
    fn current(&self) -> Arc<MemoryParameter> {
        let pad = self.page.at(self.slot);
        match self.target {
            PageParamTarget::Device(id) => pad.parameter(id),
            PageParamTarget::RemoteControl(index) => pad.remote_control(index),
        }
    }
}

impl Parameter for PageParameter {
    fn exists(&self) -> bool {
        self.current().exists()
    }

    fn name(&self) -> String {
        self.current().name()
    }

    fn value(&self) -> f64 {
        self.current().value()
    }

    fn set(&self, value: f64) {
        self.current().set(value);
    }

    fn inc(&self, delta: i32, resolution: u32) {
        self.current().inc(delta, resolution);
    }
}

// ---------------------------------------------------------------------------
// Track level collaborators
// ---------------------------------------------------------------------------

pub struct MemoryChainSelector {
    active: AtomicUsize,
    chain_count: usize,
    editor_layer: Mutex<Option<usize>>,
    bus: Bus,
}

impl MemoryChainSelector {
    /// Layer last shown in the device editor
    pub fn editor_layer(&self) -> Option<usize> {
        *self.editor_layer.lock()
    }
}

impl ChainSelector for MemoryChainSelector {
    fn active_chain_index(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    fn step_active_chain(&self, delta: i32) {
        let current = self.active_chain_index() as i64;
        let last = self.chain_count.saturating_sub(1) as i64;
        let next = (current + i64::from(delta)).clamp(0, last) as usize;
        if next as i64 != current {
            self.active.store(next, Ordering::SeqCst);
            self.bus.publish(DawEvent::ActiveChainIndex(next));
        }
    }

    fn select_layer_in_editor(&self, index: usize) {
        *self.editor_layer.lock() = Some(index);
    }
}

pub struct MemoryClip {
    loop_length: Mutex<f64>,
    scroll_step: AtomicI32,
    notes: Mutex<BTreeSet<(u8, u8)>>,
    bus: Bus,
}

impl MemoryClip {
    /// Advance the playhead (as the transport would)
    pub fn play_step(&self, step: i32) {
        self.bus.publish(DawEvent::PlayingStep(step));
    }

    /// Externally driven note edit
    pub fn set_note(&self, step: u8, key: u8, on: bool) {
        let changed = {
            let mut notes = self.notes.lock();
            if on {
                notes.insert((step, key))
            } else {
                notes.remove(&(step, key))
            }
        };
        if changed {
            self.bus.publish(DawEvent::NoteStep { step, key, on });
        }
    }

    pub fn has_note(&self, step: u8, key: u8) -> bool {
        self.notes.lock().contains(&(step, key))
    }

    pub fn scroll_step(&self) -> i32 {
        self.scroll_step.load(Ordering::SeqCst)
    }
}

impl CursorClip for MemoryClip {
    fn loop_length(&self) -> f64 {
        *self.loop_length.lock()
    }

    fn set_loop_length(&self, beats: f64) {
        *self.loop_length.lock() = beats;
        self.bus.publish(DawEvent::LoopLength(beats));
    }

    fn scroll_to_step(&self, step: i32) {
        self.scroll_step.store(step, Ordering::SeqCst);
    }

    fn toggle_step(&self, step: u8, key: u8, _velocity: u8) {
        let on = !self.has_note(step, key);
        self.set_note(step, key, on);
    }
}

pub struct MemoryLauncher {
    scroll_position: AtomicI32,
    selected: Mutex<Option<usize>>,
    playing: Mutex<Option<usize>>,
    content: Mutex<BTreeSet<usize>>,
    bus: Bus,
}

impl MemoryLauncher {
    pub fn scroll_position(&self) -> i32 {
        self.scroll_position.load(Ordering::SeqCst)
    }

    pub fn selected(&self) -> Option<usize> {
        *self.selected.lock()
    }

    pub fn playing(&self) -> Option<usize> {
        *self.playing.lock()
    }
}

impl ClipLauncher for MemoryLauncher {
    fn set_scroll_position(&self, position: i32) {
        self.scroll_position.store(position, Ordering::SeqCst);
        self.bus.publish(DawEvent::LauncherScrollPosition(position));
    }

    fn select(&self, slot: usize) {
        *self.selected.lock() = Some(slot);
        self.bus.publish(DawEvent::SlotSelected(slot));
    }

    fn launch(&self, slot: usize) {
        if !self.has_content(slot) {
            return;
        }
        *self.playing.lock() = Some(slot);
        self.bus.publish(DawEvent::SlotPlaying(slot));
    }

    fn has_content(&self, slot: usize) -> bool {
        self.content.lock().contains(&slot)
    }

    fn create_empty_clip(&self, slot: usize, beats: u32) {
        debug!(slot, beats, "Creating empty clip");
        self.content.lock().insert(slot);
    }
}

pub struct MemoryTransport {
    playing: AtomicBool,
    overdub: AtomicBool,
    metronome: AtomicBool,
    tempo: Mutex<f64>,
    shuffle: Arc<MemoryParameter>,
    bus: Bus,
}

impl MemoryTransport {
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn is_overdub_enabled(&self) -> bool {
        self.overdub.load(Ordering::SeqCst)
    }

    pub fn tempo(&self) -> f64 {
        *self.tempo.lock()
    }

    pub fn shuffle_parameter(&self) -> Arc<MemoryParameter> {
        self.shuffle.clone()
    }

    fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
        self.bus.publish(DawEvent::Playing(playing));
    }
}

impl Transport for MemoryTransport {
    fn continue_playback(&self) {
        self.set_playing(true);
    }

    fn stop(&self) {
        self.set_playing(false);
    }

    fn toggle_overdub(&self) {
        let enabled = !self.overdub.fetch_xor(true, Ordering::SeqCst);
        self.bus.publish(DawEvent::OverdubEnabled(enabled));
    }

    fn toggle_metronome(&self) {
        let enabled = !self.metronome.fetch_xor(true, Ordering::SeqCst);
        self.bus.publish(DawEvent::MetronomeEnabled(enabled));
    }

    fn is_metronome_enabled(&self) -> bool {
        self.metronome.load(Ordering::SeqCst)
    }

    fn inc_tempo(&self, bpm: f64) {
        let mut tempo = self.tempo.lock();
        *tempo = (*tempo + bpm).clamp(20.0, 666.0);
    }

    fn shuffle(&self) -> Arc<dyn Parameter> {
        self.shuffle.clone()
    }
}

#[derive(Default)]
pub struct MemoryBrowser {
    open: AtomicBool,
    target: Mutex<Option<String>>,
    selection: Mutex<Option<DeviceKind>>,
    file_offset: AtomicI32,
    commits: AtomicUsize,
}

impl MemoryBrowser {
    /// The cursor starts on a device of the kind being replaced
    fn open(&self, target: &str, kind: Option<DeviceKind>) {
        debug!(target, "Browser opened");
        *self.target.lock() = Some(target.to_string());
        *self.selection.lock() = kind;
        self.open.store(true, Ordering::SeqCst);
    }

    /// Move the cursor to a result of another kind (`None` for a preset)
    pub fn select_result(&self, kind: Option<DeviceKind>) {
        *self.selection.lock() = kind;
    }

    /// Label of the device being browsed for
    pub fn target(&self) -> Option<String> {
        self.target.lock().clone()
    }

    pub fn file_offset(&self) -> i32 {
        self.file_offset.load(Ordering::SeqCst)
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        *self.target.lock() = None;
        *self.selection.lock() = None;
    }
}

impl PopupBrowser for MemoryBrowser {
    fn exists(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn selected_device(&self) -> Option<DeviceKind> {
        if self.exists() {
            *self.selection.lock()
        } else {
            None
        }
    }

    fn cancel(&self) {
        self.close();
    }

    fn commit(&self) {
        if self.exists() {
            self.commits.fetch_add(1, Ordering::SeqCst);
        }
        self.close();
    }

    fn select_next_file(&self) {
        self.file_offset.fetch_add(1, Ordering::SeqCst);
    }

    fn select_previous_file(&self) {
        self.file_offset.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MemoryNoteInput {
    key_table: Mutex<KeyTable>,
    velocity_table: Mutex<VelocityTable>,
}

impl MemoryNoteInput {
    /// Run one incoming note through the installed tables
    pub fn translate(&self, key: u8, velocity: u8) -> Option<(u8, u8)> {
        let note = self.key_table.lock().translate(key)?;
        Some((note, self.velocity_table.lock().translate(velocity)))
    }

    pub fn key_table(&self) -> KeyTable {
        self.key_table.lock().clone()
    }

    pub fn velocity_table(&self) -> VelocityTable {
        self.velocity_table.lock().clone()
    }
}

impl NoteInput for MemoryNoteInput {
    fn set_key_translation_table(&self, table: &KeyTable) {
        *self.key_table.lock() = table.clone();
    }

    fn set_velocity_translation_table(&self, table: &VelocityTable) {
        *self.velocity_table.lock() = table.clone();
    }
}

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

struct MemoryRack {
    drum_machine: Arc<MemoryDevice>,
    bank: Arc<MemoryDrumPadBank>,
}

impl MemoryRack {
    fn new(
        hierarchy: Hierarchy,
        insert_delay: Duration,
        browser: &Arc<MemoryBrowser>,
        bus: &Bus,
    ) -> Self {
        let scroll = Arc::new(AtomicI32::new(FIRST_PAD_BANK_POSITION));
        let pads = (0..PADS_PER_RACK)
            .map(|index| {
                Arc::new(MemoryPad::new(
                    hierarchy,
                    index,
                    scroll.clone(),
                    insert_delay,
                    browser,
                    bus.clone(),
                ))
            })
            .collect();

        Self {
            drum_machine: Arc::new(MemoryDevice::new(
                format!("{} Drum Machine", hierarchy),
                None,
                true,
                browser.clone(),
            )),
            bank: Arc::new(MemoryDrumPadBank {
                hierarchy,
                page: PadPage {
                    pads: Arc::new(pads),
                    scroll,
                },
                bus: bus.clone(),
            }),
        }
    }
}

/// In-memory implementation of [`DawBinding`]
pub struct MemoryDaw {
    bus: Bus,
    browser: Arc<MemoryBrowser>,
    instrument_selector: Arc<MemoryDevice>,
    chain_selector: Arc<MemoryChainSelector>,
    root: MemoryRack,
    nested: MemoryRack,
    track_volume: Arc<MemoryParameter>,
    transport: Arc<MemoryTransport>,
    clip: Arc<MemoryClip>,
    launcher: Arc<MemoryLauncher>,
    note_input: Arc<MemoryNoteInput>,
}

impl MemoryDaw {
    pub fn new() -> Self {
        Self::with_insert_delay(Duration::ZERO)
    }

    /// Inserted devices only become addressable after `delay`
    pub fn with_insert_delay(delay: Duration) -> Self {
        let bus: Bus = Arc::new(EventBus::new());
        let browser = Arc::new(MemoryBrowser::default());

        Self {
            instrument_selector: Arc::new(MemoryDevice::new(
                "Instrument Selector",
                None,
                false,
                browser.clone(),
            )),
            chain_selector: Arc::new(MemoryChainSelector {
                active: AtomicUsize::new(0),
                chain_count: INSTRUMENT_SELECTOR_CHAINS,
                editor_layer: Mutex::new(None),
                bus: bus.clone(),
            }),
            root: MemoryRack::new(Hierarchy::Root, delay, &browser, &bus),
            nested: MemoryRack::new(Hierarchy::Nested, delay, &browser, &bus),
            track_volume: Arc::new(MemoryParameter::new("Track Volume", 0.5)),
            transport: Arc::new(MemoryTransport {
                playing: AtomicBool::new(false),
                overdub: AtomicBool::new(false),
                metronome: AtomicBool::new(false),
                tempo: Mutex::new(120.0),
                shuffle: Arc::new(MemoryParameter::new("Shuffle", 0.0)),
                bus: bus.clone(),
            }),
            clip: Arc::new(MemoryClip {
                loop_length: Mutex::new(4.0),
                scroll_step: AtomicI32::new(0),
                notes: Mutex::new(BTreeSet::new()),
                bus: bus.clone(),
            }),
            launcher: Arc::new(MemoryLauncher {
                scroll_position: AtomicI32::new(0),
                selected: Mutex::new(None),
                playing: Mutex::new(None),
                content: Mutex::new(BTreeSet::new()),
                bus: bus.clone(),
            }),
            note_input: Arc::new(MemoryNoteInput::default()),
            browser,
            bus,
        }
    }

    fn rack(&self, hierarchy: Hierarchy) -> &MemoryRack {
        match hierarchy {
            Hierarchy::Root => &self.root,
            Hierarchy::Nested => &self.nested,
        }
    }

    /// Add or remove the instrument selector (switches the active hierarchy)
    pub fn set_instrument_selector(&self, exists: bool) {
        self.instrument_selector.set_exists(exists);
    }

    /// Pad by absolute index (0-15); index 8 is the first pad of the upper page
    pub fn pad(&self, hierarchy: Hierarchy, index: usize) -> Arc<MemoryPad> {
        self.rack(hierarchy).bank.memory_pad(index)
    }

    pub fn bank(&self, hierarchy: Hierarchy) -> Arc<MemoryDrumPadBank> {
        self.rack(hierarchy).bank.clone()
    }

    pub fn device(&self, hierarchy: Hierarchy, index: usize, kind: DeviceKind) -> Arc<MemoryDevice> {
        self.pad(hierarchy, index).device(kind)
    }

    pub fn parameter(&self, hierarchy: Hierarchy, index: usize, id: ParamId) -> Arc<MemoryParameter> {
        self.pad(hierarchy, index).parameter(id)
    }

    fn page(&self, hierarchy: Hierarchy) -> PadPage {
        self.rack(hierarchy).bank.page.clone()
    }

    pub fn memory_track_volume(&self) -> Arc<MemoryParameter> {
        self.track_volume.clone()
    }

    pub fn memory_transport(&self) -> Arc<MemoryTransport> {
        self.transport.clone()
    }

    pub fn clip(&self) -> Arc<MemoryClip> {
        self.clip.clone()
    }

    pub fn launcher(&self) -> Arc<MemoryLauncher> {
        self.launcher.clone()
    }

    pub fn browser(&self) -> Arc<MemoryBrowser> {
        self.browser.clone()
    }

    pub fn chains(&self) -> Arc<MemoryChainSelector> {
        self.chain_selector.clone()
    }

    pub fn memory_note_input(&self) -> Arc<MemoryNoteInput> {
        self.note_input.clone()
    }

    /// Report a note sounding on the track
    pub fn emit_track_note(&self, key: u8, on: bool) {
        self.bus.publish(DawEvent::TrackNote { key, on });
    }

    fn snapshot(&self) -> Vec<DawEvent> {
        let mut events = vec![
            DawEvent::Playing(self.transport.is_playing()),
            DawEvent::OverdubEnabled(self.transport.is_overdub_enabled()),
            DawEvent::MetronomeEnabled(self.transport.is_metronome_enabled()),
            DawEvent::LoopLength(self.clip.loop_length()),
            DawEvent::LauncherScrollPosition(self.launcher.scroll_position()),
            DawEvent::PadBankScrollPosition(self.root.bank.scroll_position()),
        ];
        if let Some(slot) = self.launcher.playing() {
            events.push(DawEvent::SlotPlaying(slot));
        }
        events.extend(
            self.clip
                .notes
                .lock()
                .iter()
                .map(|&(step, key)| DawEvent::NoteStep { step, key, on: true }),
        );
        events
    }
}

impl Default for MemoryDaw {
    fn default() -> Self {
        Self::new()
    }
}

impl DawBinding for MemoryDaw {
    fn instrument_selector(&self) -> Arc<dyn Device> {
        self.instrument_selector.clone()
    }

    fn chain_selector(&self) -> Arc<dyn ChainSelector> {
        self.chain_selector.clone()
    }

    fn drum_machine(&self, hierarchy: Hierarchy) -> Arc<dyn Device> {
        self.rack(hierarchy).drum_machine.clone()
    }

    fn drum_pad_bank(&self, hierarchy: Hierarchy) -> Arc<dyn DrumPadBank> {
        self.rack(hierarchy).bank.clone()
    }

    fn pad_device(&self, hierarchy: Hierarchy, slot: usize, kind: DeviceKind) -> Arc<dyn Device> {
        Arc::new(PageDevice {
            page: self.page(hierarchy),
            slot,
            kind,
        })
    }

    fn device_parameter(
        &self,
        hierarchy: Hierarchy,
        slot: usize,
        id: ParamId,
    ) -> Arc<dyn Parameter> {
        Arc::new(PageParameter {
            page: self.page(hierarchy),
            slot,
            target: PageParamTarget::Device(id),
        })
    }

    fn remote_control(
        &self,
        hierarchy: Hierarchy,
        slot: usize,
        index: usize,
    ) -> Arc<dyn Parameter> {
        Arc::new(PageParameter {
            page: self.page(hierarchy),
            slot,
            target: PageParamTarget::RemoteControl(index),
        })
    }

    fn track_volume(&self) -> Arc<dyn Parameter> {
        self.track_volume.clone()
    }

    fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    fn cursor_clip(&self) -> Arc<dyn CursorClip> {
        self.clip.clone()
    }

    fn clip_launcher(&self) -> Arc<dyn ClipLauncher> {
        self.launcher.clone()
    }

    fn popup_browser(&self) -> Arc<dyn PopupBrowser> {
        self.browser.clone()
    }

    fn note_input(&self) -> Arc<dyn NoteInput> {
        self.note_input.clone()
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<DawEvent> {
        self.bus.subscribe_with(self.snapshot())
    }
}
