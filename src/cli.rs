//! Command-line helpers

use anyhow::{Context, Result};
use colored::*;

use crate::config::AppConfig;
use crate::surface::SurfaceDriver;

/// Print the system MIDI ports, marking the ones matching the configuration
pub fn print_ports(config: &AppConfig) -> Result<()> {
    let inputs = SurfaceDriver::list_input_ports().context("Failed to list MIDI input ports")?;
    let outputs = SurfaceDriver::list_output_ports().context("Failed to list MIDI output ports")?;

    println!("\n{}", "=== Available MIDI Ports ===".bold().cyan());
    print_section("Input Ports:", &inputs, &config.midi.input_port);
    print_section("Output Ports:", &outputs, &config.midi.output_port);

    let input = inputs.iter().find(|name| matches(name, &config.midi.input_port));
    let output = outputs.iter().find(|name| matches(name, &config.midi.output_port));
    match (input, output) {
        (Some(input), Some(output)) => {
            println!("\n{}", "Detected SparkLE:".bold().bright_green());
            println!("  Input:  {}", input.bright_white());
            println!("  Output: {}", output.bright_white());
        }
        _ => {
            println!(
                "\n{} {}",
                "SparkLE not found, looking for".yellow(),
                config.midi.input_port.bright_white()
            );
        }
    }
    println!();

    Ok(())
}

fn print_section(title: &str, ports: &[String], pattern: &str) {
    println!("\n{}", title.bold());
    if ports.is_empty() {
        println!("  {}", "No ports found".dimmed());
        return;
    }
    for port in ports {
        let marker = if matches(port, pattern) {
            "[MATCH]".green()
        } else {
            "[     ]".dimmed()
        };
        println!("  {} {}", marker, port);
    }
}

/// Same matching rule as the surface driver
fn matches(port: &str, pattern: &str) -> bool {
    port.to_lowercase().contains(&pattern.to_lowercase())
}
