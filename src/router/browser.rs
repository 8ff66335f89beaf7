//! Browser controller
//!
//! Opens the DAW's popup browser on the drum machine or on the selected
//! pad's instrument, provisioning a sampler (and on commit a filter) when
//! the pad is empty. The project button switches the dial to stepping
//! through the instrument selector's chains.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::SurfaceContext;
use crate::bus::EventBus;
use crate::daw::{ChainSelector, DawEvent, Device, DeviceKind, PopupBrowser};
use crate::midi::MidiEvent;
use crate::surface::layout::{cc, encoder, note};

struct BrowserController {
    ctx: Arc<SurfaceContext>,
    popup: Arc<dyn PopupBrowser>,
    instrument_selector: Arc<dyn Device>,
    chains: Arc<dyn ChainSelector>,
}

impl BrowserController {
    async fn on_midi(&self, event: MidiEvent) {
        match event {
            MidiEvent::NoteOn { note, .. } => match note {
                note::BROWSER_PROJECT => self.toggle_selector_browsing(),
                note::BROWSER_KIT if !self.browsing_selector() => {
                    self.browse_or_cancel(self.ctx.resolver.resolve_drum_machine().as_ref());
                }
                note::BROWSER_INSTRUMENT if !self.browsing_selector() => {
                    self.browse_instrument().await;
                }
                note::BROWSER_DIAL_PUSH => self.commit().await,
                _ => {}
            },
            MidiEvent::ControlChange {
                controller: cc::BROWSER_DIAL,
                value,
            } => self.on_dial(value),
            _ => {}
        }
    }

    fn browsing_selector(&self) -> bool {
        self.ctx.state.instrument_selector_browsing.get()
    }

    fn toggle_selector_browsing(&self) {
        if self.instrument_selector.exists() && !self.popup.exists() {
            let browsing = self.ctx.state.toggle_instrument_selector_browsing();
            info!("Instrument selector browsing: {}", browsing);
        }
    }

    fn browse_or_cancel(&self, device: &dyn Device) {
        if self.popup.exists() {
            self.popup.cancel();
        } else {
            device.browse_to_replace();
        }
    }

    /// Browse the pad's instrument, inserting a sampler on an empty pad
    async fn browse_instrument(&self) {
        if let Some(instrument) = self.ctx.resolver.resolve_instrument() {
            self.browse_or_cancel(instrument.as_ref());
            return;
        }

        // Captured before provisioning so the browser opens on the pad that got the sampler
        let sampler = self.ctx.resolver.resolve_device(DeviceKind::Sampler);
        let ready = self.ctx.resolver.provision_sampler().await;
        debug!(ready, "Sampler provisioned, opening browser");
        sampler.browse_to_replace();
    }

    /// Sampler defaults are only applied when a sampler was committed
    async fn commit(&self) {
        let committed = self.popup.selected_device();
        self.popup.commit();
        if committed == Some(DeviceKind::Sampler) {
            self.ctx.resolver.apply_sampler_defaults().await;
        } else {
            debug!(?committed, "Committed without sampler defaults");
        }
        self.ctx.resolver.provision_filter().await;
    }

    fn on_dial(&self, value: u8) {
        let delta = match value {
            encoder::MINUS => -1,
            encoder::PLUS => 1,
            _ => return,
        };

        if self.browsing_selector() {
            self.chains.step_active_chain(delta);
        } else if delta < 0 {
            self.popup.select_previous_file();
        } else {
            self.popup.select_next_file();
        }
    }
}

pub(super) fn spawn(ctx: &Arc<SurfaceContext>, bus: &EventBus<MidiEvent>) -> Vec<JoinHandle<()>> {
    let mut midi = bus.subscribe();
    let mut daw = ctx.daw.subscribe();
    let mut browsing = ctx.state.instrument_selector_browsing.subscribe();

    let controller = BrowserController {
        ctx: ctx.clone(),
        popup: ctx.daw.popup_browser(),
        instrument_selector: ctx.daw.instrument_selector(),
        chains: ctx.daw.chain_selector(),
    };

    vec![tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(event) = midi.recv() => controller.on_midi(event).await,
                Some(event) = daw.recv() => {
                    if let DawEvent::ActiveChainIndex(index) = event {
                        controller.chains.select_layer_in_editor(index);
                    }
                }
                Some(on) = browsing.recv() => controller.ctx.leds.set(note::BROWSER_PROJECT, on),
                else => break,
            }
        }
    })]
}
