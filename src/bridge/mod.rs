//! Digital-analog bridges.
//!
//! A bridge adapts one discrete logic component to the continuous solver:
//! it resolves named pins to solver nodes at construction, exposes boolean
//! pin accessors over the solved voltage vector, and realizes digital
//! outputs by big-conductance forcing.
//!
//! Bridges are only ever invoked sequentially from the single solver worker
//! thread, one `load` per bridge per iteration against the same solved
//! voltage vector; that guarantee is what sanctions their direct mutation
//! of the shared matrix.

mod logic;
mod memory;

pub use logic::LogicBridge;
pub use memory::MemoryBridge;

use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::solver::NodalMatrix;
use crate::{FORCING_CONDUCTANCE, LOGIC_THRESHOLD, V_HIGH, V_LOW};

/// An output pin changed state. Posted on the pin-event channel every time
/// a bridge stamps an output; the rendering consumer drains the queue on
/// its own schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinStateEvent {
    /// Component name
    pub component: Arc<str>,
    /// Output pin index within the component
    pub pin: usize,
    /// Driven logic level
    pub state: bool,
}

/// Logic level parameters shared by all pin conversions.
#[derive(Debug, Clone)]
pub struct LogicLevels {
    /// Input voltage at or above this reads as logic-high
    pub threshold: f64,
    /// Target voltage for a high output
    pub v_high: f64,
    /// Target voltage for a low output
    pub v_low: f64,
}

impl Default for LogicLevels {
    fn default() -> Self {
        Self {
            threshold: LOGIC_THRESHOLD,
            v_high: V_HIGH,
            v_low: V_LOW,
        }
    }
}

/// The pin handle passed to a logic routine on every iteration.
///
/// Pin indices must be below the component's declared widths; compiled
/// routines are width-checked at construction, native providers are
/// trusted to stay in range.
pub trait PinAccess {
    /// Number of declared input pins.
    fn inputs(&self) -> usize;
    /// Number of declared output pins.
    fn outputs(&self) -> usize;
    /// Solved logic state of an input pin (ground-referenced threshold).
    fn input(&self, pin: usize) -> bool;
    /// Solved voltage of an input pin relative to the ground pin.
    fn input_voltage(&self, pin: usize) -> f64;
    /// Solved logic state of an output pin (reads the node back).
    fn output(&self, pin: usize) -> bool;
    /// Drive an output pin this iteration.
    fn set_output(&mut self, pin: usize, state: bool);
    /// Routine logging hook.
    fn log(&self, message: &str);
}

/// Force an output node toward a logic level.
///
/// Adds [`FORCING_CONDUCTANCE`] to the node's diagonal and the conductance
/// times the target level to its right-hand side. The conductance dwarfs
/// every natural path at the node, so the solve lands the node on the
/// target without a new equation or topology change.
pub(crate) fn stamp_forced_level(
    matrix: &mut NodalMatrix,
    row: usize,
    state: bool,
    levels: &LogicLevels,
) {
    matrix.add(row, row, FORCING_CONDUCTANCE);
    let target = if state { levels.v_high } else { levels.v_low };
    matrix.add_rhs(row, FORCING_CONDUCTANCE * target);
}

/// A constructed bridge, tagged by kind.
#[derive(Debug)]
pub enum Bridge {
    Logic(LogicBridge),
    Memory(MemoryBridge),
}

impl Bridge {
    /// Component name this bridge was constructed for.
    pub fn name(&self) -> &str {
        match self {
            Bridge::Logic(b) => b.name(),
            Bridge::Memory(b) => b.name(),
        }
    }

    /// Per-iteration load: read solved inputs, compute outputs, stamp.
    pub fn load(&mut self, matrix: &mut NodalMatrix) -> crate::error::Result<()> {
        match self {
            Bridge::Logic(b) => b.load(matrix),
            Bridge::Memory(b) => b.load(matrix),
        }
    }
}

/// Post a pin event, ignoring a disconnected consumer.
pub(crate) fn post_event(
    events: &Sender<PinStateEvent>,
    component: &Arc<str>,
    pin: usize,
    state: bool,
) {
    let _ = events.send(PinStateEvent {
        component: component.clone(),
        pin,
        state,
    });
}
