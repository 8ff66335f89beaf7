//! Parameters controller
//!
//! Volume knob, parameter bank buttons and the three assignable knobs.

use std::sync::Arc;

use tokio::task::JoinHandle;

use super::SurfaceContext;
use crate::bus::EventBus;
use crate::daw::Parameter;
use crate::device::MIXER_RESOLUTION;
use crate::feedback;
use crate::midi::MidiEvent;
use crate::state::ParameterBank;
use crate::surface::layout::{cc, encoder, note};

struct ParametersController {
    ctx: Arc<SurfaceContext>,
    track_volume: Arc<dyn Parameter>,
}

impl ParametersController {
    fn on_midi(&self, event: MidiEvent) {
        match event {
            MidiEvent::NoteOn { note, .. } => {
                let bank = match note {
                    note::INSTRUMENT_FILTER => ParameterBank::Filter,
                    note::SEND_1_2 => ParameterBank::Sends,
                    note::PAN_LEVEL => ParameterBank::PanLevel,
                    _ => return,
                };
                self.ctx.state.set_parameter_bank(bank);
            }
            MidiEvent::ControlChange { controller, value } => self.on_knob(controller, value),
            MidiEvent::NoteOff { .. } => {}
        }
    }

    fn on_knob(&self, controller: u8, value: u8) {
        if controller == cc::VOLUME {
            if self.track_volume.exists() {
                self.track_volume.inc(encoder::delta(value), MIXER_RESOLUTION);
            }
            return;
        }

        let resolver = &self.ctx.resolver;
        match (self.ctx.state.parameter_bank.get(), controller) {
            (ParameterBank::Filter, cc::PARAM_1) => resolver.set_filter_type(value),
            (ParameterBank::Filter, cc::PARAM_2) => resolver.set_filter_resonance(value),
            (ParameterBank::Filter, cc::PARAM_3) => resolver.set_filter_cutoff(value),
            (ParameterBank::Sends, cc::PARAM_1) => resolver.set_send_level(0, value),
            (ParameterBank::Sends, cc::PARAM_2) => resolver.set_send_level(1, value),
            (ParameterBank::Sends, cc::PARAM_3) => resolver.set_send_level(2, value),
            (ParameterBank::PanLevel, cc::PARAM_1) => resolver.set_pan(value),
            (ParameterBank::PanLevel, cc::PARAM_2) => resolver.set_volume(value),
            (ParameterBank::PanLevel, cc::PARAM_3) => resolver.set_decay(value),
            _ => {}
        }
    }
}

pub(super) fn spawn(ctx: &Arc<SurfaceContext>, bus: &EventBus<MidiEvent>) -> Vec<JoinHandle<()>> {
    let mut midi = bus.subscribe();
    let mut parameter_bank = ctx.state.parameter_bank.subscribe();
    let controller = ParametersController {
        ctx: ctx.clone(),
        track_volume: ctx.daw.track_volume(),
    };

    vec![tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(event) = midi.recv() => controller.on_midi(event),
                Some(bank) = parameter_bank.recv() => {
                    controller.ctx.leds.apply(&feedback::parameter_bank_leds(bank));
                }
                else => break,
            }
        }
    })]
}
