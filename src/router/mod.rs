//! Router module - wiring of the reactive core
//!
//! The Router owns the input event bus and the shared [`SurfaceContext`],
//! and spawns one task per controller:
//! - pads: pad input, pad LEDs, track note feedback
//! - pad controls: select, pad bank switcher, mute/solo modes, velocity-off
//! - steps: steps modes, clip launcher banks and patterns, step sequencer
//! - parameters: volume knob and the three assignable knobs
//! - transport: play, stop, record, metronome, tempo and shuffle
//! - browser: device browsing and auto-provisioning
//!
//! Each controller subscribes to everything it needs before its task is
//! spawned, so no event published after [`Router::start`] is missed.

mod browser;
mod pad_controls;
mod pads;
mod parameters;
mod steps;
mod transport;

#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::bus::EventBus;
use crate::config::AppConfig;
use crate::daw::DawBinding;
use crate::device::DeviceResolver;
use crate::feedback::{self, HeldSteps};
use crate::midi::{Classifier, MidiEvent};
use crate::state::ModeState;
use crate::surface::LedSink;
use crate::translation;

/// Everything a controller needs, shared between all of them
pub struct SurfaceContext {
    pub state: Arc<ModeState>,
    pub daw: Arc<dyn DawBinding>,
    pub resolver: Arc<DeviceResolver>,
    pub leds: Arc<dyn LedSink>,
    /// Held steps per pad, fed by the clip's note notifications
    pub held: Mutex<HeldSteps>,
}

/// Main router wiring input, state, DAW and LEDs together
pub struct Router {
    ctx: Arc<SurfaceContext>,
    bus: Arc<EventBus<MidiEvent>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl Router {
    pub fn new(daw: Arc<dyn DawBinding>, leds: Arc<dyn LedSink>, config: &AppConfig) -> Self {
        let state = Arc::new(ModeState::new());
        let settle_timeout = Duration::from_millis(config.timing.settle_timeout_ms);
        let resolver = Arc::new(DeviceResolver::new(daw.as_ref(), state.clone(), settle_timeout));

        Self {
            ctx: Arc::new(SurfaceContext {
                state,
                daw,
                resolver,
                leds,
                held: Mutex::new(HeldSteps::new()),
            }),
            bus: Arc::new(EventBus::new()),
            tasks: Mutex::new(Vec::new()),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Classifier publishing onto this router's input bus
    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.bus.clone())
    }

    pub fn context(&self) -> &Arc<SurfaceContext> {
        &self.ctx
    }

    /// Spawn every controller; must be called from within a tokio runtime
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            return;
        }

        tasks.extend(translation::spawn(
            self.ctx.state.clone(),
            self.ctx.daw.note_input(),
        ));
        tasks.extend(pads::spawn(&self.ctx, &self.bus));
        tasks.extend(pad_controls::spawn(&self.ctx, &self.bus));
        tasks.extend(steps::spawn(&self.ctx, &self.bus));
        tasks.extend(parameters::spawn(&self.ctx, &self.bus));
        tasks.extend(transport::spawn(&self.ctx, &self.bus));
        tasks.extend(browser::spawn(&self.ctx, &self.bus));

        info!("Router started ({} tasks)", tasks.len());
    }

    /// Abort every controller and turn all LEDs off, once
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        self.ctx.leds.apply(&feedback::shutdown_sweep());
        info!("Router shut down, LEDs cleared");
    }
}
