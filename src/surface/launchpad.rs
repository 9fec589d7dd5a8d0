//! Novation Launchpad driver
//!
//! Finds the Launchpad ports by name, forwards parsed input to a channel and
//! writes lighting commands to the output port.

use anyhow::{anyhow, Context, Result};
use midir::{MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection, MidiOutputPort};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use super::LedOutput;
use crate::midi::{format_hex, MidiMessage};

/// Input events buffered between the MIDI callback and the bridge
const INPUT_BUFFER: usize = 1000;

/// Launchpad hardware connection
pub struct LaunchpadDevice {
    port_pattern: String,
    input_conn: Option<MidiInputConnection<()>>,
    output_conn: Option<Mutex<MidiOutputConnection>>,
    event_tx: mpsc::Sender<MidiMessage>,
    event_rx: Option<mpsc::Receiver<MidiMessage>>,
}

impl LaunchpadDevice {
    /// Create a detached device matching ports by `port_pattern`
    pub fn new(port_pattern: impl Into<String>) -> Self {
        let (event_tx, event_rx) = mpsc::channel(INPUT_BUFFER);
        Self {
            port_pattern: port_pattern.into(),
            input_conn: None,
            output_conn: None,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Open the first input and output ports matching the pattern
    pub fn connect(&mut self) -> Result<()> {
        self.disconnect();

        info!("🎹 Looking for Launchpad ports matching '{}'", self.port_pattern);

        let midi_in = MidiInput::new("Launchpad-GW-Input").context("Failed to create MIDI input")?;
        debug!("Found {} MIDI input ports", midi_in.port_count());

        let (in_port, in_name) = find_input_port(&midi_in, &self.port_pattern)
            .ok_or_else(|| anyhow!("No MIDI input port matching '{}'", self.port_pattern))?;

        let midi_out =
            MidiOutput::new("Launchpad-GW-Output").context("Failed to create MIDI output")?;
        debug!("Found {} MIDI output ports", midi_out.port_count());

        let (out_port, out_name) = find_output_port(&midi_out, &self.port_pattern)
            .ok_or_else(|| anyhow!("No MIDI output port matching '{}'", self.port_pattern))?;

        let event_tx = self.event_tx.clone();
        let input_conn = midi_in
            .connect(
                &in_port,
                "Launchpad-GW",
                move |_timestamp, data, _| {
                    trace!("RX {}", format_hex(data));
                    match MidiMessage::parse(data) {
                        // Never block the MIDI thread
                        Some(message) => {
                            let _ = event_tx.try_send(message);
                        },
                        None => trace!("Ignoring MIDI: {}", format_hex(data)),
                    }
                },
                (),
            )
            .map_err(|e| anyhow!("Failed to connect to input port '{}': {}", in_name, e))?;

        let output_conn = midi_out
            .connect(&out_port, "Launchpad-GW")
            .map_err(|e| anyhow!("Failed to connect to output port '{}': {}", out_name, e))?;

        self.input_conn = Some(input_conn);
        self.output_conn = Some(Mutex::new(output_conn));

        info!("✅ Launchpad connected - in: '{}', out: '{}'", in_name, out_name);
        Ok(())
    }

    /// Close both ports
    pub fn disconnect(&mut self) {
        if self.is_connected() {
            info!("Launchpad disconnected");
        }
        self.input_conn = None;
        self.output_conn = None;
    }

    pub fn is_connected(&self) -> bool {
        self.input_conn.is_some() && self.output_conn.is_some()
    }

    /// Take the input receiver (once)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<MidiMessage>> {
        self.event_rx.take()
    }
}

impl LedOutput for LaunchpadDevice {
    fn send(&self, message: &MidiMessage) -> Result<()> {
        let Some(output) = self.output_conn.as_ref() else {
            return Ok(());
        };

        let data = message.encode();
        output
            .lock()
            .send(&data)
            .map_err(|e| anyhow!("Failed to send MIDI message: {}", e))?;

        trace!("TX {} | {}", format_hex(&data), message);
        Ok(())
    }
}

/// Case-insensitive substring match on port names
fn matches_pattern(name: &str, pattern: &str) -> bool {
    name.to_lowercase().contains(&pattern.to_lowercase())
}

fn find_input_port(midi_in: &MidiInput, pattern: &str) -> Option<(MidiInputPort, String)> {
    midi_in.ports().into_iter().find_map(|port| {
        let name = midi_in.port_name(&port).ok()?;
        matches_pattern(&name, pattern).then_some((port, name))
    })
}

fn find_output_port(midi_out: &MidiOutput, pattern: &str) -> Option<(MidiOutputPort, String)> {
    midi_out.ports().into_iter().find_map(|port| {
        let name = midi_out.port_name(&port).ok()?;
        matches_pattern(&name, pattern).then_some((port, name))
    })
}

/// Port discovery utilities
pub mod discovery {
    use super::*;
    use colored::*;

    /// Information about a MIDI port
    #[derive(Debug, Clone)]
    pub struct PortInfo {
        pub index: usize,
        pub name: String,
        pub is_virtual: bool,
    }

    fn is_virtual(name: &str) -> bool {
        name.contains("Virtual") || name.contains("loopMIDI") || name.contains("IAC")
    }

    pub fn discover_input_ports() -> Result<Vec<PortInfo>> {
        let midi_in = MidiInput::new("Launchpad-GW-Discovery")?;
        Ok(midi_in
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(index, port)| {
                let name = midi_in.port_name(port).ok()?;
                Some(PortInfo {
                    index,
                    is_virtual: is_virtual(&name),
                    name,
                })
            })
            .collect())
    }

    pub fn discover_output_ports() -> Result<Vec<PortInfo>> {
        let midi_out = MidiOutput::new("Launchpad-GW-Discovery")?;
        Ok(midi_out
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(index, port)| {
                let name = midi_out.port_name(port).ok()?;
                Some(PortInfo {
                    index,
                    is_virtual: is_virtual(&name),
                    name,
                })
            })
            .collect())
    }

    /// Input and output port names the device would open for `pattern`
    pub fn find_launchpad_ports(pattern: &str) -> Option<(String, String)> {
        let inputs = discover_input_ports().ok()?;
        let outputs = discover_output_ports().ok()?;

        let input = inputs.iter().find(|p| matches_pattern(&p.name, pattern))?;
        let output = outputs.iter().find(|p| matches_pattern(&p.name, pattern))?;
        Some((input.name.clone(), output.name.clone()))
    }

    fn print_section(title: &str, ports: Result<Vec<PortInfo>>) {
        println!("\n{}", title.bold());
        match ports {
            Ok(ports) if ports.is_empty() => println!("  {}", "No ports found".dimmed()),
            Ok(ports) => {
                for port in ports {
                    let marker = if port.is_virtual {
                        "[VIRTUAL]".yellow()
                    } else {
                        "[PHYSICAL]".green()
                    };
                    println!("  {}: {} {}", port.index, marker, port.name);
                }
            },
            Err(e) => println!("  {} {}", "Port scan failed:".red(), e),
        }
    }

    /// Print every MIDI port and the ports picked for `pattern`
    pub fn list_ports_formatted(pattern: &str) {
        println!("\n{}", "=== Available MIDI Ports ===".bold().cyan());

        print_section("Input Ports:", discover_input_ports());
        print_section("Output Ports:", discover_output_ports());

        match find_launchpad_ports(pattern) {
            Some((input, output)) => {
                println!("\n{}", "Auto-detected Launchpad:".bold().bright_green());
                println!("  Input:  {}", input.bright_white());
                println!("  Output: {}", output.bright_white());
            },
            None => println!(
                "\n{} '{}'",
                "No Launchpad ports match".yellow(),
                pattern
            ),
        }

        println!();
    }
}
