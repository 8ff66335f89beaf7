//! State management module - UI mode state of the surface
//!
//! Every piece of mode state (pads mode, steps mode, selected pad, ...)
//! lives in its own [`StateCell`]. Cells publish every change to their
//! subscribers; controllers react to those notifications to update the
//! DAW and the LEDs.

mod cell;
mod store;
mod types;

pub use cell::StateCell;
pub use store::{ModeState, PAD_BANK_SIZE};
pub use types::{PadsMode, ParameterBank, StepsMode};
