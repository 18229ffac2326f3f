//! Transient analysis loop.

use std::time::Duration;

use super::matrix::NodalMatrix;
use super::{CONVERGENCE_TOLERANCE, MAX_ITERATIONS};
use crate::circuit::Circuit;
use crate::error::{CosimError, Result};

/// Leak conductance from every node to ground, so that a node driven by
/// nothing this iteration still has a well-conditioned row.
const GMIN: f64 = 1e-12;

/// Transient run parameters.
#[derive(Debug, Clone)]
pub struct TransientConfig {
    /// Simulated time advanced per step
    pub step: f64,
    /// Simulated time at which a run completes
    pub final_time: f64,
    /// Wall-clock delay inserted after each step by the run worker
    pub step_delay: Duration,
    /// Restart from t = 0 after reaching the final time
    pub loop_enabled: bool,
    /// Maximum settle iterations per step
    pub max_iterations: usize,
    /// Successive-iterate settle tolerance
    pub tolerance: f64,
}

impl Default for TransientConfig {
    fn default() -> Self {
        Self {
            step: 1e-7,
            final_time: 200e-6,
            step_delay: Duration::from_millis(1),
            loop_enabled: false,
            max_iterations: MAX_ITERATIONS,
            tolerance: CONVERGENCE_TOLERANCE,
        }
    }
}

impl TransientConfig {
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    pub fn with_final_time(mut self, final_time: f64) -> Self {
        self.final_time = final_time;
        self
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn with_loop_enabled(mut self, enabled: bool) -> Self {
        self.loop_enabled = enabled;
        self
    }
}

/// Result of advancing the analysis by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Time advanced and the circuit settled
    Advanced,
    /// The final time had already been reached
    Complete,
}

/// One transient analysis over a built circuit.
///
/// The matrix dimension is fixed at construction from the circuit's node
/// and branch counts; `begin` rewinds time for a fresh run without
/// reallocating.
pub struct Transient {
    config: TransientConfig,
    matrix: NodalMatrix,
    time: f64,
    steps: u64,
}

impl Transient {
    pub fn new(circuit: &Circuit, config: TransientConfig) -> Self {
        Self {
            matrix: NodalMatrix::new(circuit.matrix_size()),
            config,
            time: 0.0,
            steps: 0,
        }
    }

    /// Rewind to t = 0 and discard the previous run's operating point.
    pub fn begin(&mut self) {
        self.time = 0.0;
        self.steps = 0;
        self.matrix.x.fill(0.0);
    }

    /// Current simulated time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Steps completed since `begin`.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn config(&self) -> &TransientConfig {
        &self.config
    }

    /// Advance simulated time by one step and settle the circuit.
    pub fn advance(&mut self, circuit: &mut Circuit) -> Result<StepOutcome> {
        if self.time >= self.config.final_time {
            return Ok(StepOutcome::Complete);
        }
        self.time += self.config.step;
        self.settle(circuit)?;
        self.steps += 1;
        Ok(StepOutcome::Advanced)
    }

    /// Re-stamp and solve until two successive solutions agree.
    ///
    /// Bridges read the previous iterate's voltages and stamp their
    /// responses, so a digital feedback path needs one extra iteration per
    /// stage to propagate; the iteration cap turns a true oscillation
    /// within a single time step into [`CosimError::ConvergenceFailure`].
    fn settle(&mut self, circuit: &mut Circuit) -> Result<()> {
        let mut previous = self.matrix.x.clone();
        let mut residual = f64::INFINITY;

        for _ in 0..self.config.max_iterations {
            self.matrix.clear();

            for row in 0..circuit.nodes.node_count() - 1 {
                self.matrix.add(row, row, GMIN);
            }

            for clock in &circuit.clocks {
                self.matrix.stamp_voltage_source(
                    circuit.nodes.matrix_row(clock.node),
                    circuit.nodes.matrix_row(clock.ground),
                    circuit.branch_row(clock.branch),
                    clock.pulse.level(self.time),
                );
            }

            for bridge in &mut circuit.bridges {
                bridge.load(&mut self.matrix)?;
            }

            self.matrix.factor()?;
            self.matrix.solve()?;

            residual = self
                .matrix
                .x
                .iter()
                .zip(&previous)
                .map(|(new, old)| (new - old).abs())
                .fold(0.0f64, f64::max);
            if residual < self.config.tolerance {
                return Ok(());
            }
            previous.copy_from_slice(&self.matrix.x);
        }

        Err(CosimError::convergence_failure(
            self.config.max_iterations,
            residual,
        ))
    }

    /// Solved voltage of a named node, ground-referenced.
    pub fn voltage(&self, circuit: &Circuit, node: &str) -> Option<f64> {
        circuit
            .nodes
            .resolve(node)
            .map(|node| self.matrix.voltage(circuit.nodes.matrix_row(node)))
    }
}
