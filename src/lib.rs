//! # Cosim Core
//!
//! A digital-analog co-simulation core: programmable logic components are
//! bridged into a nodal transient solver and driven by a background
//! simulation worker.
//!
//! This library provides:
//! - Nodal matrix assembly with big-conductance forcing of digital levels
//! - A small combinational routine language for programmable logic blocks
//! - A byte-store memory component emulated through pin semantics
//! - A thread-safe simulation controller with run/pause/step/stop
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`routine`] - Compiler and provider trait for per-component logic
//! - [`components`] - Component descriptors and clock waveforms
//! - [`circuit`] - Node map, construction registry and validation
//! - [`bridge`] - Digital-analog pin bridges (logic and memory)
//! - [`solver`] - Matrix assembly, LU solving and the transient loop
//! - [`controller`] - Project description and the run worker
//!
//! ## Usage
//!
//! ```no_run
//! use cosim_core::{
//!     ComponentDescriptor, LogicSource, Pulse, Result, SimulationController,
//!     SimulationProject, VoltageProbe,
//! };
//!
//! fn main() -> Result<()> {
//!     let project = SimulationProject::new("demo")
//!         .add_component(ComponentDescriptor::clock(
//!             "CLK",
//!             "clk",
//!             Pulse::square(20_000.0, 0.0, 5.0),
//!         ))
//!         .add_component(ComponentDescriptor::logic(
//!             "U1",
//!             vec!["clk".into()],
//!             vec!["q".into()],
//!             "0",
//!             LogicSource::Inline("out[0] = !in[0]".into()),
//!         ));
//!
//!     let controller = SimulationController::new(project);
//!     controller.set_observer(|time: f64, probe: &dyn VoltageProbe| {
//!         println!("t={:.3e} q={:.2}", time, probe.voltage("q").unwrap_or(0.0));
//!     });
//!     controller.start()?;
//!     controller.wait();
//!     Ok(())
//! }
//! ```
//!
//! ## Simulation Method
//!
//! Each time step assembles the system Ax = z from scratch:
//!
//! 1. Clock sources are stamped as voltage sources at their waveform level
//! 2. Each bridge reads the previous iterate's solved voltages through its
//!    input pins, runs its logic, and forces its outputs with a large
//!    conductance toward the high or low rail
//! 3. The system is LU-factored and solved
//! 4. Steps 1-3 repeat until two successive solutions agree, so digital
//!    levels propagate through chains of components within one time step
//!
//! All stamping and solving happens on a single worker thread; bridges are
//! invoked strictly sequentially against the same matrix.

pub mod bridge;
pub mod circuit;
pub mod components;
pub mod controller;
pub mod error;
pub mod routine;
pub mod solver;

// Re-export main types for convenience
pub use bridge::{LogicBridge, LogicLevels, MemoryBridge, PinAccess, PinStateEvent};
pub use circuit::Circuit;
pub use components::{ComponentDescriptor, ComponentKind, Pulse};
pub use controller::{SimulationController, SimulationProject, StepObserver, VoltageProbe};
pub use error::{CosimError, Result};
pub use routine::{LogicProvider, LogicSource, RoutineProgram};
pub use solver::{StepOutcome, Transient, TransientConfig};

/// Input voltage at or above this level reads as logic-high
pub const LOGIC_THRESHOLD: f64 = 2.5;

/// Rail voltage driven for a high output
pub const V_HIGH: f64 = 5.0;

/// Rail voltage driven for a low output
pub const V_LOW: f64 = 0.0;

/// Conductance used to force digital output levels. Large enough to dwarf
/// any natural path at an output node.
pub const FORCING_CONDUCTANCE: f64 = 1e6;
