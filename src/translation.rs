//! Note input translation tables
//!
//! The DAW note input remaps incoming keys and velocities through two
//! 128-entry tables. They are recompiled from mode state whenever one of
//! the cells they depend on publishes.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, trace};

use crate::daw::NoteInput;
use crate::state::{ModeState, PadsMode, PAD_BANK_SIZE};
use crate::surface::layout;

pub const TABLE_SIZE: usize = 128;

/// Velocity forced on every note while velocity-off is active
pub const FIXED_VELOCITY: u8 = 100;

/// Key remap; `None` drops the key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTable([Option<u8>; TABLE_SIZE]);

impl KeyTable {
    /// Table dropping every key
    pub fn disabled() -> Self {
        Self([None; TABLE_SIZE])
    }

    pub fn translate(&self, key: u8) -> Option<u8> {
        self.0.get(usize::from(key)).copied().flatten()
    }
}

impl Default for KeyTable {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Velocity remap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VelocityTable([u8; TABLE_SIZE]);

impl VelocityTable {
    pub fn identity() -> Self {
        let mut table = [0u8; TABLE_SIZE];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = i as u8;
        }
        Self(table)
    }

    pub fn fixed(velocity: u8) -> Self {
        Self([velocity; TABLE_SIZE])
    }

    pub fn translate(&self, velocity: u8) -> u8 {
        self.0[usize::from(velocity & 0x7F)]
    }
}

impl Default for VelocityTable {
    fn default() -> Self {
        Self::identity()
    }
}

/// Pad keys map to drum notes 36..43 (44..51 on the upper bank)
///
/// Every key is dropped while select is held or the pads are not in
/// Play mode.
pub fn compile_key_table(select_pressed: bool, pads_mode: PadsMode, switched: bool) -> KeyTable {
    let mut table = KeyTable::disabled();
    if select_pressed || pads_mode != PadsMode::Play {
        return table;
    }

    let offset = if switched { PAD_BANK_SIZE as u8 } else { 0 };
    for key in layout::note::PADS {
        table.0[usize::from(key)] = Some(key - layout::PAD_TO_DRUM_NOTE_SHIFT + offset);
    }
    table
}

pub fn compile_velocity_table(velocity_off: bool) -> VelocityTable {
    if velocity_off {
        VelocityTable::fixed(FIXED_VELOCITY)
    } else {
        VelocityTable::identity()
    }
}

fn install_key_table(state: &ModeState, input: &dyn NoteInput) {
    let select_pressed = state.select_pressed.get();
    let pads_mode = state.pads_mode.get();
    let switched = state.pad_bank_switched.get();
    let table = compile_key_table(select_pressed, pads_mode, switched);
    trace!(select_pressed, %pads_mode, switched, "Key translation table compiled");
    input.set_key_translation_table(&table);
}

/// Keep both tables in sync with mode state
///
/// Each subscription delivers the current value first, so the tables are
/// installed once right away.
pub fn spawn(state: Arc<ModeState>, input: Arc<dyn NoteInput>) -> Vec<JoinHandle<()>> {
    let key_triggers = state
        .select_pressed
        .subscribe_stream()
        .map(|_| ())
        .merge(state.pads_mode.subscribe_stream().map(|_| ()))
        .merge(state.pad_bank_switched.subscribe_stream().map(|_| ()));

    let key_task = {
        let state = state.clone();
        let input = input.clone();
        tokio::spawn(async move {
            tokio::pin!(key_triggers);
            while key_triggers.next().await.is_some() {
                install_key_table(&state, input.as_ref());
            }
        })
    };

    let mut velocity_off = state.velocity_off.subscribe();
    let velocity_task = tokio::spawn(async move {
        while let Some(off) = velocity_off.recv().await {
            debug!(velocity_off = off, "Velocity translation table compiled");
            input.set_velocity_translation_table(&compile_velocity_table(off));
        }
    });

    vec![key_task, velocity_task]
}
