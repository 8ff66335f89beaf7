//! SparkLE GW library
//!
//! Reactive core of the SparkLE control surface: input classification,
//! mode state, translation tables, device resolution and LED feedback,
//! wired together by the [`router::Router`].

pub mod bus;
pub mod cli;
pub mod config;
pub mod daw;
pub mod device;
pub mod feedback;
pub mod midi;
pub mod paths;
pub mod router;
pub mod state;
pub mod surface;
pub mod translation;
