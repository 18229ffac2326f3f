//! Circuit representation and construction.
//!
//! This module provides the node map shared with the solver, and the
//! [`Circuit`] built from component descriptors: logic bridges, memory
//! bridges and clock sources resolved onto solver nodes, ready for a
//! transient run.

mod graph;
mod types;
mod validate;

pub use graph::{Circuit, NodeMap};
pub use types::*;
pub use validate::validate_components;
