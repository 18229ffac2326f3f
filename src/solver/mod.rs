//! Nodal transient solver.
//!
//! This module provides the numerical engine the bridges stamp into.
//!
//! The system Ax = z is assembled fresh on every iteration:
//! - x contains node voltages and clock branch currents
//! - A is the conductance/coefficient matrix
//! - z is the source vector
//!
//! Digital outputs are realized by big-conductance forcing: a bridge adds a
//! conductance much larger than anything else in the circuit to an output
//! node's diagonal, plus that conductance times the target level to the
//! right-hand side. The solved node voltage then lands arbitrarily close to
//! the target without changing the matrix topology.

mod matrix;
mod transient;

pub use matrix::NodalMatrix;
pub use transient::{StepOutcome, Transient, TransientConfig};

/// Successive-iterate tolerance for the per-step settle loop.
pub const CONVERGENCE_TOLERANCE: f64 = 1e-6;

/// Maximum settle iterations per time step.
pub const MAX_ITERATIONS: usize = 50;
