//! Scenario tests for the Router, driven through the classifier against
//! the in-memory DAW

use super::*;
use crate::daw::memory::MemoryDaw;
use crate::daw::{
    ChainSelector, CursorClip, Device, DeviceKind, DrumPad, Hierarchy, ParamId, Parameter,
    PopupBrowser, Transport,
};
use crate::state::{PadsMode, StepsMode};
use crate::surface::layout::{cc, note};
use crate::surface::RecordingLeds;

struct Harness {
    daw: Arc<MemoryDaw>,
    leds: Arc<RecordingLeds>,
    router: Router,
    classifier: Classifier,
}

impl Harness {
    async fn start() -> Self {
        let daw = Arc::new(MemoryDaw::new());
        let leds = Arc::new(RecordingLeds::new());
        let router = Router::new(daw.clone(), leds.clone(), &AppConfig::default());
        let classifier = router.classifier();
        router.start();
        drain(&leds).await;
        leds.clear();

        Self {
            daw,
            leds,
            router,
            classifier,
        }
    }

    fn state(&self) -> &ModeState {
        &self.router.context().state
    }

    async fn press(&self, note: u8) {
        self.press_with(note, 127).await;
    }

    async fn press_with(&self, note: u8, velocity: u8) {
        self.classifier.dispatch(0x90, note, velocity);
        self.settle().await;
    }

    async fn release(&self, note: u8) {
        self.classifier.dispatch(0x80, note, 0);
        self.settle().await;
    }

    async fn turn(&self, controller: u8, value: u8) {
        self.classifier.dispatch(0xB0, controller, value);
        self.settle().await;
    }

    async fn settle(&self) {
        drain(&self.leds).await;
    }

    /// Select a pad the way a user does: select held, pad pressed
    async fn select_pad(&self, pad: u8) {
        self.press(note::SELECT).await;
        self.press(note::PAD_BASE + pad).await;
        self.release(note::SELECT).await;
    }
}

/// Upper bound for the router to go idle
const SETTLE_LIMIT: Duration = Duration::from_secs(2);
/// Scheduler passes without LED traffic taken as idle
const IDLE_PASSES: usize = 16;

/// Let every controller drain its queue
///
/// Tests run on the current-thread runtime, so each yield hands the
/// scheduler to all woken tasks. The router is idle once the recorded LED
/// traffic stops changing for `IDLE_PASSES` passes.
async fn drain(leds: &RecordingLeds) {
    let idle = async {
        let mut seen = leds.events().len();
        let mut quiet = 0;
        while quiet < IDLE_PASSES {
            tokio::task::yield_now().await;
            let now = leds.events().len();
            quiet = if now == seen { quiet + 1 } else { 0 };
            seen = now;
        }
    };
    tokio::time::timeout(SETTLE_LIMIT, idle)
        .await
        .expect("router did not go idle");
}

#[tokio::test]
async fn test_play_mode_echoes_pad_once() {
    let h = Harness::start().await;
    h.select_pad(3).await;
    h.leds.clear();

    h.press_with(63, 100).await;
    assert_eq!(
        h.leds.events(),
        vec![MidiEvent::NoteOn {
            note: 63,
            velocity: 100
        }]
    );

    h.release(63).await;
    assert_eq!(h.leds.events().len(), 2);
}

#[tokio::test]
async fn test_select_pad_does_not_echo() {
    let h = Harness::start().await;
    h.press(note::SELECT).await;
    h.leds.clear();

    h.press(65).await;
    assert_eq!(h.state().selected_pad.get(), 5);
    assert_eq!(h.leds.note_ons(65), 0);
    assert_eq!(h.leds.state_of(73), Some(true));
}

#[tokio::test]
async fn test_entering_mute_paints_bank_flags() {
    let h = Harness::start().await;
    h.daw.pad(Hierarchy::Root, 1).set_muted(true);
    h.daw.pad(Hierarchy::Root, 5).set_muted(true);
    h.settle().await;

    h.press(note::MUTE).await;
    assert_eq!(h.state().pads_mode.get(), PadsMode::Mute);
    assert_eq!(h.leds.state_of(note::MUTE), Some(true));
    for slot in 0..8u8 {
        let expected = slot == 1 || slot == 5;
        assert_eq!(h.leds.state_of(60 + slot), Some(expected), "pad {}", slot);
    }

    h.press(62).await;
    assert!(h.daw.pad(Hierarchy::Root, 2).is_muted());
    assert_eq!(h.leds.state_of(62), Some(true));

    h.press(note::MUTE).await;
    assert_eq!(h.state().pads_mode.get(), PadsMode::Play);
    assert_eq!(h.leds.state_of(note::MUTE), Some(false));
    assert!(h.leds.lit().iter().all(|n| !note::PADS.contains(n)));
    // Leaving without select keeps the mutes
    assert!(h.daw.pad(Hierarchy::Root, 1).is_muted());
}

#[tokio::test]
async fn test_leaving_solo_with_select_clears_solos() {
    let h = Harness::start().await;
    h.press(note::SOLO).await;
    h.press(60).await;
    h.press(67).await;
    assert!(h.daw.pad(Hierarchy::Root, 7).is_soloed());

    h.press(note::SELECT).await;
    h.press(note::SOLO).await;
    h.release(note::SELECT).await;

    assert!(!h.daw.pad(Hierarchy::Root, 0).is_soloed());
    assert!(!h.daw.pad(Hierarchy::Root, 7).is_soloed());
    assert_eq!(h.state().pads_mode.get(), PadsMode::Play);
}

#[tokio::test]
async fn test_mute_targets_nested_hierarchy() {
    let h = Harness::start().await;
    h.daw.set_instrument_selector(true);
    h.press(note::MUTE).await;
    h.press(60).await;

    assert!(h.daw.pad(Hierarchy::Nested, 0).is_muted());
    assert!(!h.daw.pad(Hierarchy::Root, 0).is_muted());

    // Root changes are not shown while the nested rack is active
    h.leds.clear();
    h.daw.pad(Hierarchy::Root, 3).set_muted(true);
    h.settle().await;
    assert_eq!(h.leds.state_of(63), None);
}

#[tokio::test]
async fn test_mute_mode_follows_switched_bank() {
    let h = Harness::start().await;
    h.daw.pad(Hierarchy::Root, 1).set_muted(true);
    h.daw.pad(Hierarchy::Root, 12).set_muted(true);
    h.settle().await;

    h.press(note::PAD_BANK_SWITCHER).await;
    h.press(note::MUTE).await;
    for slot in 0..8u8 {
        assert_eq!(h.leds.state_of(60 + slot), Some(slot == 4), "pad {}", slot);
    }

    // Slot 0 of the upper page is pad 8
    h.press(60).await;
    assert!(h.daw.pad(Hierarchy::Root, 8).is_muted());
    assert!(!h.daw.pad(Hierarchy::Root, 0).is_muted());
    assert_eq!(h.leds.state_of(60), Some(true));

    // Switching back repaints the lower page flags
    h.press(note::PAD_BANK_SWITCHER).await;
    assert_eq!(h.leds.state_of(60), Some(false));
    assert_eq!(h.leds.state_of(61), Some(true));
    assert_eq!(h.leds.state_of(64), Some(false));
}

#[tokio::test]
async fn test_sequencer_playhead_blinks_held_step() {
    let h = Harness::start().await;
    h.select_pad(2).await;
    h.press(note::SEQUENCER).await;
    h.daw.clip().set_note(0, 38, true);
    h.daw.clip().set_note(4, 38, true);
    h.settle().await;
    assert_eq!(h.leds.state_of(0), Some(true));
    assert_eq!(h.leds.state_of(4), Some(true));
    h.leds.clear();

    h.daw.clip().play_step(4);
    h.settle().await;
    assert_eq!(h.leds.state_of(4), Some(false));
    assert!(h.leds.lit().is_empty());

    h.daw.clip().play_step(5);
    h.settle().await;
    assert_eq!(h.leds.state_of(4), Some(true));
    assert_eq!(h.leds.state_of(5), Some(true));
}

#[tokio::test]
async fn test_sequencer_step_toggles_selected_pad_note() {
    let h = Harness::start().await;
    h.select_pad(1).await;
    h.press(note::SEQUENCER).await;

    h.press(3).await;
    assert!(h.daw.clip().has_note(3, 37));
    assert_eq!(h.leds.state_of(3), Some(true));

    h.press(3).await;
    assert!(!h.daw.clip().has_note(3, 37));
    assert_eq!(h.leds.state_of(3), Some(false));
}

#[tokio::test]
async fn test_sequencer_row_follows_selected_pad() {
    let h = Harness::start().await;
    h.daw.clip().set_note(6, 36, true);
    h.daw.clip().set_note(9, 40, true);
    h.press(note::SEQUENCER).await;
    assert_eq!(h.leds.state_of(6), Some(true));

    h.select_pad(4).await;
    assert_eq!(h.leds.state_of(6), Some(false));
    assert_eq!(h.leds.state_of(9), Some(true));
}

#[tokio::test]
async fn test_decay_dual_write_on_sampler() {
    let h = Harness::start().await;
    h.daw.device(Hierarchy::Root, 0, DeviceKind::Sampler).set_exists(true);
    h.daw.pad(Hierarchy::Root, 0).remote_control(3).set_name("Release");

    h.turn(cc::PARAM_3, 66).await;
    let decay = h.daw.parameter(Hierarchy::Root, 0, ParamId::SamplerDecay);
    let release = h.daw.pad(Hierarchy::Root, 0).remote_control(3);
    assert_eq!(decay.value(), 0.5 + 2.0 / 64.0);
    assert_eq!(release.value(), 0.5 + 2.0 / 64.0);
}

#[tokio::test]
async fn test_parameter_banks_route_knobs() {
    let h = Harness::start().await;
    let pad = h.daw.pad(Hierarchy::Root, 0);

    h.turn(cc::PARAM_1, 65).await;
    assert_eq!(pad.pan_parameter().value(), 0.5 + 1.0 / 128.0);

    h.press(note::SEND_1_2).await;
    assert_eq!(h.leds.state_of(note::SEND_1_2), Some(true));
    assert_eq!(h.leds.state_of(note::PAN_LEVEL), Some(false));
    h.turn(cc::PARAM_2, 68).await;
    let send = pad.send_parameter(1).map(|p| p.value());
    assert_eq!(send, Some(4.0 / 64.0));

    h.press(note::INSTRUMENT_FILTER).await;
    h.daw.device(Hierarchy::Root, 0, DeviceKind::Filter).set_exists(true);
    h.turn(cc::PARAM_1, 65).await;
    assert_eq!(h.daw.parameter(Hierarchy::Root, 0, ParamId::FilterType).value(), 0.5);
}

#[tokio::test]
async fn test_volume_knob_moves_track_volume() {
    let h = Harness::start().await;
    h.turn(cc::VOLUME, 62).await;
    assert_eq!(h.daw.memory_track_volume().value(), 0.5 - 2.0 / 128.0);
}

#[tokio::test]
async fn test_double_switch_restores_bank() {
    let h = Harness::start().await;
    let input = h.daw.memory_note_input();
    assert_eq!(input.key_table().translate(60), Some(36));

    h.press(note::PAD_BANK_SWITCHER).await;
    assert!(h.state().pad_bank_switched.get());
    assert_eq!(input.key_table().translate(60), Some(44));
    assert_eq!(h.daw.bank(Hierarchy::Root).scroll_position(), 44);
    assert_eq!(h.daw.bank(Hierarchy::Nested).scroll_position(), 44);

    h.press(note::PAD_BANK_SWITCHER).await;
    assert!(!h.state().pad_bank_switched.get());
    assert_eq!(input.key_table().translate(60), Some(36));
    assert_eq!(h.daw.bank(Hierarchy::Root).scroll_position(), 36);
}

#[tokio::test]
async fn test_switched_bank_offsets_selection_and_track_notes() {
    let h = Harness::start().await;
    h.press(note::PAD_BANK_SWITCHER).await;
    h.select_pad(2).await;
    assert_eq!(h.state().selected_pad.get(), 10);
    h.leds.clear();

    h.daw.emit_track_note(46, true);
    h.daw.emit_track_note(38, true);
    h.settle().await;
    assert_eq!(h.leds.state_of(62), Some(true));
    assert_eq!(h.leds.note_ons(62), 1);
}

#[tokio::test]
async fn test_velocity_off_toggle() {
    let h = Harness::start().await;
    let input = h.daw.memory_note_input();

    h.press(note::SELECT).await;
    h.press(note::STEP_16).await;
    assert_eq!(h.leds.state_of(note::STEP_16), Some(true));
    h.release(note::SELECT).await;
    assert!(h.state().velocity_off.get());
    assert_eq!(input.velocity_table().translate(0), 100);
    assert_eq!(input.velocity_table().translate(127), 100);
    // Bank mode ignores the step while select is held
    assert_eq!(h.daw.launcher().scroll_position(), 0);

    h.press(note::SELECT).await;
    h.press(note::STEP_16).await;
    h.release(note::SELECT).await;
    assert_eq!(input.velocity_table().translate(57), 57);
}

#[tokio::test]
async fn test_select_shows_metronome() {
    let h = Harness::start().await;
    h.press(note::SELECT).await;
    assert_eq!(h.leds.state_of(note::SELECT), Some(true));

    h.press(note::STEP_14).await;
    assert!(h.daw.memory_transport().is_metronome_enabled());
    assert_eq!(h.leds.state_of(note::STEP_14), Some(true));

    h.release(note::SELECT).await;
    assert_eq!(h.leds.state_of(note::STEP_14), Some(false));
    assert_eq!(h.leds.state_of(note::SELECT), Some(false));
    // Bank row is back after release
    assert_eq!(h.leds.state_of(0), Some(true));
}

#[tokio::test]
async fn test_bank_mode_scrolls_launcher() {
    let h = Harness::start().await;
    h.press(3).await;
    assert_eq!(h.daw.launcher().scroll_position(), 48);
    assert_eq!(h.state().bank.get(), 3);
    assert_eq!(h.leds.lit(), vec![3]);
}

#[tokio::test]
async fn test_pattern_mode_creates_and_launches_clip() {
    let h = Harness::start().await;
    h.press(note::PATTERN).await;
    assert_eq!(h.state().steps_mode.get(), StepsMode::Pattern);

    h.press(2).await;
    let launcher = h.daw.launcher();
    assert_eq!(launcher.selected(), Some(2));
    assert_eq!(launcher.playing(), Some(2));
    assert_eq!(h.state().playing_pattern.get(), 2);
    assert_eq!(h.leds.state_of(2), Some(true));

    // Select + step only selects
    h.press(note::SELECT).await;
    h.press(7).await;
    assert_eq!(launcher.selected(), Some(7));
    assert_eq!(launcher.playing(), Some(2));
    assert_eq!(h.leds.state_of(7), Some(true));

    h.release(note::SELECT).await;
    assert_eq!(h.leds.state_of(7), Some(false));
    assert_eq!(h.leds.state_of(2), Some(true));
}

#[tokio::test]
async fn test_pattern_length_and_page() {
    let h = Harness::start().await;
    let clip = h.daw.clip();
    h.press(note::SEQUENCER).await;

    h.press(note::SELECT).await;
    h.press(note::PATTERN_LENGTH_RIGHT).await;
    assert_eq!(clip.loop_length(), 8.0);
    assert_eq!(h.leds.state_of(42), Some(true));
    h.release(note::SELECT).await;
    assert_eq!(h.leds.state_of(41), Some(true));

    h.press(note::PATTERN_LENGTH_RIGHT).await;
    assert_eq!(h.state().clip_page_position.get(), 1);
    assert_eq!(clip.scroll_step(), 16);
    assert_eq!(h.leds.state_of(42), Some(true));

    // Shrinking the loop pulls the page back
    h.press(note::SELECT).await;
    h.press(note::PATTERN_LENGTH_LEFT).await;
    h.press(note::PATTERN_LENGTH_LEFT).await;
    assert_eq!(clip.loop_length(), 4.0);
    h.release(note::SELECT).await;
    assert_eq!(h.state().clip_page_position.get(), 0);
    assert_eq!(clip.scroll_step(), 0);
    assert_eq!(h.leds.state_of(41), Some(true));
}

#[tokio::test]
async fn test_tune_mode_transposes_sampler() {
    let h = Harness::start().await;
    h.daw.device(Hierarchy::Root, 0, DeviceKind::Sampler).set_exists(true);
    h.press(note::TUNE).await;

    let speed = h.daw.parameter(Hierarchy::Root, 0, ParamId::SamplerSpeed);
    h.press(8).await;
    assert_eq!(speed.value(), 0.625);
    h.press(0).await;
    assert_eq!(speed.value(), 0.57875);
}

#[tokio::test]
async fn test_transport_buttons_and_tempo() {
    let h = Harness::start().await;
    let transport = h.daw.memory_transport();

    h.press(note::PLAY_PAUSE).await;
    assert!(transport.is_playing());
    assert_eq!(h.leds.state_of(note::PLAY_PAUSE), Some(true));

    h.press(note::REC).await;
    assert!(transport.is_overdub_enabled());
    assert_eq!(h.leds.state_of(note::REC), Some(true));

    h.press(note::STOP).await;
    assert_eq!(h.leds.state_of(note::PLAY_PAUSE), Some(false));

    h.turn(cc::TEMPO, 63).await;
    assert!((transport.tempo() - 119.9).abs() < 1e-9);

    h.press(note::SELECT).await;
    h.turn(cc::TEMPO, 66).await;
    assert_eq!(transport.shuffle_parameter().value(), 2.0 / 64.0);
    assert!((transport.tempo() - 119.9).abs() < 1e-9);
}

#[tokio::test]
async fn test_instrument_button_provisions_sampler() {
    let h = Harness::start().await;
    let browser = h.daw.browser();

    h.press(note::BROWSER_INSTRUMENT).await;
    assert!(h.daw.device(Hierarchy::Root, 0, DeviceKind::Sampler).exists());
    assert!(browser.exists());
    assert_eq!(browser.target().as_deref(), Some("root Sampler pad 0"));
    let sustain = h.daw.parameter(Hierarchy::Root, 0, ParamId::SamplerSustain);
    assert_eq!(sustain.value(), 0.0);

    h.turn(cc::BROWSER_DIAL, 65).await;
    assert_eq!(browser.file_offset(), 1);

    h.press(note::BROWSER_DIAL_PUSH).await;
    assert_eq!(browser.commit_count(), 1);
    assert!(h.daw.device(Hierarchy::Root, 0, DeviceKind::Filter).exists());
    let cutoff = h.daw.parameter(Hierarchy::Root, 0, ParamId::FilterCutoff);
    assert_eq!(cutoff.value(), 1.0);

    // A second press on a provisioned pad toggles the browser
    h.press(note::BROWSER_INSTRUMENT).await;
    assert!(browser.exists());
    h.press(note::BROWSER_INSTRUMENT).await;
    assert!(!browser.exists());
}

#[tokio::test]
async fn test_commit_without_sampler_skips_defaults() {
    let h = Harness::start().await;
    let browser = h.daw.browser();
    h.daw.device(Hierarchy::Root, 0, DeviceKind::Kick).set_exists(true);

    h.press(note::BROWSER_INSTRUMENT).await;
    assert_eq!(browser.target().as_deref(), Some("root Kick pad 0"));
    assert_eq!(browser.selected_device(), Some(DeviceKind::Kick));

    // Nothing waits for a sampler, the filter follows the commit at once
    h.press(note::BROWSER_DIAL_PUSH).await;
    assert_eq!(browser.commit_count(), 1);
    assert!(h.daw.device(Hierarchy::Root, 0, DeviceKind::Filter).exists());

    // Swapping a sampler for a preset keeps its settings
    h.daw.device(Hierarchy::Root, 1, DeviceKind::Sampler).set_exists(true);
    h.select_pad(1).await;
    h.press(note::BROWSER_INSTRUMENT).await;
    browser.select_result(None);
    h.press(note::BROWSER_DIAL_PUSH).await;
    assert_eq!(browser.commit_count(), 2);
    let mode = h.daw.parameter(Hierarchy::Root, 1, ParamId::SamplerMode);
    assert_eq!(mode.write_count(), 0);
}

#[tokio::test]
async fn test_project_button_steps_selector_chains() {
    let h = Harness::start().await;
    h.press(note::BROWSER_PROJECT).await;
    assert!(!h.state().instrument_selector_browsing.get());

    h.daw.set_instrument_selector(true);
    h.press(note::BROWSER_PROJECT).await;
    assert!(h.state().instrument_selector_browsing.get());
    assert_eq!(h.leds.state_of(note::BROWSER_PROJECT), Some(true));

    h.turn(cc::BROWSER_DIAL, 65).await;
    let chains = h.daw.chains();
    assert_eq!(chains.active_chain_index(), 1);
    assert_eq!(chains.editor_layer(), Some(1));
    assert_eq!(h.daw.browser().file_offset(), 0);

    // Kit browsing is locked while the selector is browsed
    h.press(note::BROWSER_KIT).await;
    assert!(!h.daw.browser().exists());
}

#[tokio::test]
async fn test_shutdown_sweeps_leds_once() {
    let h = Harness::start().await;
    h.router.shutdown();
    let events = h.leds.events();
    assert_eq!(events.len(), feedback::shutdown_sweep().len());
    assert!(h.leds.lit().is_empty());

    h.router.shutdown();
    assert_eq!(h.leds.events().len(), events.len());

    // Controllers are gone
    h.classifier.dispatch(0x90, 63, 100);
    h.settle().await;
    assert_eq!(h.leds.events().len(), events.len());
}
