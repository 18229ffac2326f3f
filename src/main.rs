//! Cosim - digital-analog co-simulation runner
//!
//! Runs a transient simulation of a clock driving a programmable logic
//! component loaded from a routine file, printing solved node voltages
//! after every step.
//!
//! # Usage
//!
//! ```bash
//! cosim blink.logic --outputs 2 --clock-hz 20000
//! ```

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use cosim_core::{
    ComponentDescriptor, LogicSource, Pulse, Result, SimulationController, SimulationProject,
    TransientConfig, VoltageProbe,
};

/// Digital-analog co-simulation runner
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the logic routine file
    #[arg(value_name = "ROUTINE_FILE")]
    routine_file: PathBuf,

    /// Number of output pins of the logic component
    #[arg(short, long, default_value_t = 1)]
    outputs: usize,

    /// Clock frequency in Hz
    #[arg(long, default_value_t = 20_000.0)]
    clock_hz: f64,

    /// Simulated time advanced per step, in seconds
    #[arg(long, default_value_t = 1e-7)]
    step: f64,

    /// Simulated time at which the run completes, in seconds
    #[arg(long, default_value_t = 200e-6)]
    final_time: f64,

    /// Wall-clock delay between steps, in milliseconds
    #[arg(long, default_value_t = 1)]
    delay_ms: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let output_pins: Vec<String> = (0..args.outputs).map(|i| format!("q{}", i)).collect();
    let project = SimulationProject::new("cosim")
        .add_component(ComponentDescriptor::clock(
            "CLK",
            "clk",
            Pulse::square(args.clock_hz, 0.0, 5.0),
        ))
        .add_component(ComponentDescriptor::logic(
            "U1",
            vec!["clk".to_string()],
            output_pins.clone(),
            "0",
            LogicSource::Path(args.routine_file),
        ))
        .with_config(
            TransientConfig::default()
                .with_step(args.step)
                .with_final_time(args.final_time)
                .with_step_delay(Duration::from_millis(args.delay_ms)),
        );

    let mut controller = SimulationController::new(project);

    if let Some(events) = controller.take_pin_events() {
        thread::spawn(move || {
            for event in events {
                log::debug!(
                    "pin event: {} out[{}] = {}",
                    event.component,
                    event.pin,
                    u8::from(event.state)
                );
            }
        });
    }

    controller.set_observer(move |time: f64, probe: &dyn VoltageProbe| {
        let mut line = format!("t={:>10.3e}  clk={:5.2}", time, probe.voltage("clk").unwrap_or(0.0));
        for pin in &output_pins {
            line.push_str(&format!("  {}={:5.2}", pin, probe.voltage(pin).unwrap_or(0.0)));
        }
        println!("{}", line);
    });

    controller.start()?;
    controller.wait();
    Ok(())
}
