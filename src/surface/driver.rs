//! SparkLE MIDI driver
//!
//! Handles MIDI communication with the SparkLE. Input is classified right
//! in the backend callback and published on the event bus; output goes
//! through the [`LedSink`] implementation.

use midir::{MidiIO, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use super::LedSink;
use crate::config::AppConfig;
use crate::midi::{format_hex, Classifier, MidiEvent};

const CLIENT_NAME: &str = "SparkLE-GW";

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("MIDI {direction} port matching '{pattern}' not found")]
    PortNotFound {
        direction: &'static str,
        pattern: String,
    },

    #[error("surface output is not connected")]
    NotConnected,

    #[error("MIDI backend unavailable: {0}")]
    Backend(#[from] midir::InitError),

    #[error("failed to connect to '{port}': {reason}")]
    Connect { port: String, reason: String },

    #[error("failed to send MIDI: {0}")]
    Send(#[from] midir::SendError),
}

/// Driver for the SparkLE hardware
pub struct SurfaceDriver {
    /// Input port name pattern
    input_port_name: String,

    /// Output port name pattern
    output_port_name: String,

    input_conn: Mutex<Option<MidiInputConnection<()>>>,
    output_conn: Mutex<Option<MidiOutputConnection>>,
}

impl SurfaceDriver {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            input_port_name: config.midi.input_port.clone(),
            output_port_name: config.midi.output_port.clone(),
            input_conn: Mutex::new(None),
            output_conn: Mutex::new(None),
        }
    }

    /// List available MIDI input ports
    pub fn list_input_ports() -> Result<Vec<String>, SurfaceError> {
        let midi_in = MidiInput::new(&format!("{}-Scanner", CLIENT_NAME))?;
        Ok(port_names(&midi_in))
    }

    /// List available MIDI output ports
    pub fn list_output_ports() -> Result<Vec<String>, SurfaceError> {
        let midi_out = MidiOutput::new(&format!("{}-Scanner", CLIENT_NAME))?;
        Ok(port_names(&midi_out))
    }

    /// Connect both ports; incoming messages are dispatched through `classifier`
    pub fn connect(&self, classifier: Classifier) -> Result<(), SurfaceError> {
        self.disconnect();

        info!(
            "Connecting to SparkLE - Input: '{}', Output: '{}'",
            self.input_port_name, self.output_port_name
        );

        let midi_in = MidiInput::new(&format!("{}-Input", CLIENT_NAME))?;
        debug!("Found {} MIDI input ports", midi_in.port_count());

        let (in_port, in_name) =
            find_port(&midi_in, &self.input_port_name).ok_or_else(|| {
                SurfaceError::PortNotFound {
                    direction: "input",
                    pattern: self.input_port_name.clone(),
                }
            })?;

        info!("Connecting to input port: {}", in_name);

        let input_conn = midi_in
            .connect(
                &in_port,
                CLIENT_NAME,
                move |_timestamp, data, _| {
                    if classifier.dispatch_raw(data).is_none() {
                        trace!("Ignored MIDI: {}", format_hex(data));
                    }
                },
                (),
            )
            .map_err(|e| SurfaceError::Connect {
                port: in_name.clone(),
                reason: e.to_string(),
            })?;

        let midi_out = MidiOutput::new(&format!("{}-Output", CLIENT_NAME))?;
        debug!("Found {} MIDI output ports", midi_out.port_count());

        let (out_port, out_name) =
            find_port(&midi_out, &self.output_port_name).ok_or_else(|| {
                SurfaceError::PortNotFound {
                    direction: "output",
                    pattern: self.output_port_name.clone(),
                }
            })?;

        info!("Connecting to output port: {}", out_name);

        let output_conn = midi_out
            .connect(&out_port, CLIENT_NAME)
            .map_err(|e| SurfaceError::Connect {
                port: out_name.clone(),
                reason: e.to_string(),
            })?;

        *self.input_conn.lock() = Some(input_conn);
        *self.output_conn.lock() = Some(output_conn);

        info!("SparkLE connected");
        Ok(())
    }

    /// Disconnect from MIDI ports
    pub fn disconnect(&self) {
        let had_input = self.input_conn.lock().take().is_some();
        let had_output = self.output_conn.lock().take().is_some();
        if had_input || had_output {
            info!("SparkLE disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.input_conn.lock().is_some() && self.output_conn.lock().is_some()
    }

    /// Send one event to the surface
    pub fn send_event(&self, event: MidiEvent) -> Result<(), SurfaceError> {
        let mut output = self.output_conn.lock();
        let conn = output.as_mut().ok_or(SurfaceError::NotConnected)?;

        let data = event.encode();
        conn.send(&data)?;

        trace!("Sent: {} | {}", format_hex(&data), event);
        Ok(())
    }
}

impl LedSink for SurfaceDriver {
    fn send(&self, event: MidiEvent) {
        if let Err(e) = self.send_event(event) {
            warn!("LED write dropped ({}): {}", event, e);
        }
    }
}

fn port_names<T: MidiIO>(io: &T) -> Vec<String> {
    io.ports()
        .iter()
        .filter_map(|port| io.port_name(port).ok())
        .collect()
}

/// Find a port by case-insensitive substring match
fn find_port<T: MidiIO>(io: &T, pattern: &str) -> Option<(T::Port, String)> {
    let pattern = pattern.to_lowercase();
    io.ports().into_iter().find_map(|port| {
        let name = io.port_name(&port).ok()?;
        if name.to_lowercase().contains(&pattern) {
            debug!("Found port '{}' matching pattern '{}'", name, pattern);
            Some((port, name))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_without_connection_fails() {
        let driver = SurfaceDriver::new(&AppConfig::default());
        assert!(!driver.is_connected());
        assert!(matches!(
            driver.send_event(MidiEvent::NoteOn { note: 1, velocity: 127 }),
            Err(SurfaceError::NotConnected)
        ));
    }

    #[test]
    fn test_led_sink_swallows_errors() {
        let driver = SurfaceDriver::new(&AppConfig::default());
        driver.note_on(5);
        driver.note_off(5);
    }
}
