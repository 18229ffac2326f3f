//! Logic routines: the per-component behavior loaded at bridge construction.
//!
//! A routine is compiled exactly once, when its bridge is constructed, and
//! then invoked once per solver iteration through [`LogicProvider`]. The
//! shipped provider is [`RoutineProgram`], a small combinational script
//! language; native strategies can plug in through the same trait (any
//! `Fn(&mut dyn PinAccess) -> Result<()>` works).

mod ast;
mod lexer;
mod parser;

pub use ast::{Expr, RoutineProgram, Stmt};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::parse;

use std::path::PathBuf;

use crate::bridge::PinAccess;
use crate::error::{CosimError, Result};

/// A pluggable logic behavior, evaluated once per solver iteration.
///
/// The provider is fully responsible for reading inputs and setting every
/// output pin it wants driven; an omitted output leaves its node un-stamped
/// for that iteration.
pub trait LogicProvider: Send {
    fn evaluate(&self, pins: &mut dyn PinAccess) -> Result<()>;
}

impl LogicProvider for RoutineProgram {
    fn evaluate(&self, pins: &mut dyn PinAccess) -> Result<()> {
        self.run(pins);
        Ok(())
    }
}

impl<F> LogicProvider for F
where
    F: Fn(&mut dyn PinAccess) -> Result<()> + Send,
{
    fn evaluate(&self, pins: &mut dyn PinAccess) -> Result<()> {
        self(pins)
    }
}

/// External reference to routine source text.
#[derive(Debug, Clone)]
pub enum LogicSource {
    /// Read from a file once at construction
    Path(PathBuf),
    /// Source text supplied directly (tests, embedded defaults)
    Inline(String),
}

impl LogicSource {
    /// Fetch the source text.
    pub fn read(&self) -> Result<String> {
        match self {
            LogicSource::Path(path) => {
                std::fs::read_to_string(path).map_err(|source| CosimError::FileReadError {
                    path: path.display().to_string(),
                    source,
                })
            }
            LogicSource::Inline(text) => Ok(text.clone()),
        }
    }
}

/// Load and compile a routine for a component with the given pin widths.
///
/// This is the once-per-construction load: any failure here aborts the run
/// before a worker thread exists.
pub fn load_routine(
    source: &LogicSource,
    inputs: usize,
    outputs: usize,
    component: &str,
) -> Result<RoutineProgram> {
    let text = source.read()?;
    let program = RoutineProgram::compile(&text)?;
    program.check_widths(inputs, outputs, component)?;
    Ok(program)
}
