//! Error types for the co-simulation core.
//!
//! This module provides a unified error type [`CosimError`] that covers
//! all error conditions that can occur during routine compilation, circuit
//! construction, and transient simulation.

use thiserror::Error;

/// Result type alias using [`CosimError`].
pub type Result<T> = std::result::Result<T, CosimError>;

/// Unified error type for all co-simulation operations.
#[derive(Error, Debug)]
pub enum CosimError {
    // ============ Routine Compilation Errors ============
    /// Error during lexical analysis of a logic routine
    #[error("Lexer error at line {line}, column {column}: {message}")]
    LexerError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Error during parsing of a logic routine
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// A routine references a pin index outside the component's declared width
    #[error("Component '{component}': routine references {pin} but only {width} pins are declared")]
    PinOutOfRange {
        component: String,
        pin: String,
        width: usize,
    },

    // ============ Construction Errors ============
    /// A pin name could not be resolved against the node map
    #[error("Component '{component}': pin '{pin}' is not present in the node map")]
    UnresolvedPin { component: String, pin: String },

    /// An output pin resolved to the ground node
    #[error("Component '{component}': output pin '{pin}' cannot be tied to ground")]
    GroundedOutput { component: String, pin: String },

    /// Two components claim the same output node
    #[error("Node '{node}' is driven by both '{first}' and '{second}' - each digital output owns exactly one node")]
    SharedOutputNode {
        node: String,
        first: String,
        second: String,
    },

    /// A descriptor declared the wrong number of pins for its kind
    #[error("Component '{component}': expected {expected} {direction} pins, got {got}")]
    PinCountMismatch {
        component: String,
        direction: &'static str,
        expected: usize,
        got: usize,
    },

    /// Invalid address/cell bit count for a memory component
    #[error("Component '{component}': {param} = {value} is outside the supported range {min}..={max}")]
    InvalidBitWidth {
        component: String,
        param: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },

    /// No components were supplied for a run
    #[error("Project has no components")]
    NoComponents,

    /// Duplicate component name
    #[error("Duplicate component name '{name}'")]
    DuplicateComponent { name: String },

    // ============ Simulation Errors ============
    /// A loaded logic routine failed during an iteration
    #[error("Routine of component '{component}' failed: {message}")]
    RoutineFault { component: String, message: String },

    /// Matrix is singular and cannot be solved
    #[error("Singular matrix - a node may be floating or left un-stamped this iteration")]
    SingularMatrix,

    /// The per-step settle loop did not converge
    #[error("Solver did not converge after {iterations} iterations (residual: {residual:.2e})")]
    ConvergenceFailure { iterations: usize, residual: f64 },

    // ============ I/O Errors ============
    /// Error reading a routine source file
    #[error("Failed to read routine file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl CosimError {
    /// Create a lexer error
    pub fn lexer(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::LexerError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create a routine fault error
    pub fn routine_fault(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RoutineFault {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a convergence failure error
    pub fn convergence_failure(iterations: usize, residual: f64) -> Self {
        Self::ConvergenceFailure {
            iterations,
            residual,
        }
    }
}
