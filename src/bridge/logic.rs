//! Programmable logic bridge.

use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use super::{post_event, stamp_forced_level, LogicLevels, PinAccess, PinStateEvent};
use crate::circuit::NodeMap;
use crate::components::ComponentDescriptor;
use crate::error::{CosimError, Result};
use crate::routine::LogicProvider;
use crate::solver::NodalMatrix;

/// Bridges one programmable logic component onto the solver.
///
/// Pin names are resolved to matrix rows at construction; per-iteration
/// `load` reads the solved input voltages, runs the provider, and stamps a
/// forced level on every output the provider drives.
pub struct LogicBridge {
    name: Arc<str>,
    levels: LogicLevels,
    /// Matrix rows of the input nodes (None = ground)
    input_rows: Vec<Option<usize>>,
    /// Matrix row of the ground reference pin (None = global ground)
    ground_row: Option<usize>,
    /// Matrix rows of the output nodes (never ground)
    output_rows: Vec<usize>,
    provider: Box<dyn LogicProvider>,
    events: Sender<PinStateEvent>,
}

// Manual impl: the provider is an opaque trait object.
impl fmt::Debug for LogicBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicBridge")
            .field("name", &self.name)
            .field("input_rows", &self.input_rows)
            .field("ground_row", &self.ground_row)
            .field("output_rows", &self.output_rows)
            .finish_non_exhaustive()
    }
}

impl LogicBridge {
    /// Resolve the descriptor's pins and bind the provider.
    pub fn new(
        descriptor: &ComponentDescriptor,
        provider: Box<dyn LogicProvider>,
        nodes: &NodeMap,
        events: Sender<PinStateEvent>,
    ) -> Result<Self> {
        let resolve = |pin: &str| {
            nodes.resolve(pin).ok_or_else(|| CosimError::UnresolvedPin {
                component: descriptor.name.clone(),
                pin: pin.to_string(),
            })
        };

        let mut input_rows = Vec::with_capacity(descriptor.inputs.len());
        for pin in &descriptor.inputs {
            input_rows.push(nodes.matrix_row(resolve(pin)?));
        }

        let ground_row = nodes.matrix_row(resolve(&descriptor.ground)?);

        let mut output_rows = Vec::with_capacity(descriptor.outputs.len());
        for pin in &descriptor.outputs {
            let node = resolve(pin)?;
            let row = nodes.matrix_row(node).ok_or_else(|| CosimError::GroundedOutput {
                component: descriptor.name.clone(),
                pin: pin.clone(),
            })?;
            output_rows.push(row);
        }

        Ok(Self {
            name: descriptor.name.as_str().into(),
            levels: LogicLevels::default(),
            input_rows,
            ground_row,
            output_rows,
            provider,
            events,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the provider against the current solution and stamp its outputs.
    pub fn load(&mut self, matrix: &mut NodalMatrix) -> Result<()> {
        let mut pins = LogicPins {
            name: &self.name,
            levels: &self.levels,
            input_rows: &self.input_rows,
            ground_row: self.ground_row,
            output_rows: &self.output_rows,
            events: &self.events,
            matrix,
        };
        self.provider
            .evaluate(&mut pins)
            .map_err(|e| CosimError::routine_fault(&*self.name, e.to_string()))
    }
}

/// Pin handle handed to the provider for one iteration.
struct LogicPins<'a> {
    name: &'a Arc<str>,
    levels: &'a LogicLevels,
    input_rows: &'a [Option<usize>],
    ground_row: Option<usize>,
    output_rows: &'a [usize],
    events: &'a Sender<PinStateEvent>,
    matrix: &'a mut NodalMatrix,
}

impl PinAccess for LogicPins<'_> {
    fn inputs(&self) -> usize {
        self.input_rows.len()
    }

    fn outputs(&self) -> usize {
        self.output_rows.len()
    }

    fn input(&self, pin: usize) -> bool {
        self.input_voltage(pin) >= self.levels.threshold
    }

    fn input_voltage(&self, pin: usize) -> f64 {
        self.matrix.voltage(self.input_rows[pin]) - self.matrix.voltage(self.ground_row)
    }

    fn output(&self, pin: usize) -> bool {
        self.matrix.voltage(Some(self.output_rows[pin])) >= self.levels.threshold
    }

    fn set_output(&mut self, pin: usize, state: bool) {
        stamp_forced_level(self.matrix, self.output_rows[pin], state, self.levels);
        post_event(self.events, self.name, pin, state);
    }

    fn log(&self, message: &str) {
        log::info!(target: "cosim::logic", "[{}] {}", self.name, message);
    }
}
