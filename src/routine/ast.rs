//! AST and evaluator for compiled logic routines.

use crate::bridge::PinAccess;
use crate::error::{CosimError, Result};

/// A boolean expression over a component's pins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Solved state of input pin i
    Input(usize),
    /// Solved state of output pin i (reads the node voltage back)
    Output(usize),
    /// Constant level
    Literal(bool),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Xor(Box<Expr>, Box<Expr>),
}

impl Expr {
    fn eval(&self, pins: &dyn PinAccess) -> bool {
        match self {
            Expr::Input(i) => pins.input(*i),
            Expr::Output(i) => pins.output(*i),
            Expr::Literal(value) => *value,
            Expr::Not(inner) => !inner.eval(pins),
            Expr::And(lhs, rhs) => lhs.eval(pins) && rhs.eval(pins),
            Expr::Or(lhs, rhs) => lhs.eval(pins) || rhs.eval(pins),
            Expr::Xor(lhs, rhs) => lhs.eval(pins) ^ rhs.eval(pins),
        }
    }

    fn check_widths(&self, inputs: usize, outputs: usize, component: &str) -> Result<()> {
        match self {
            Expr::Input(i) if *i >= inputs => Err(CosimError::PinOutOfRange {
                component: component.to_string(),
                pin: format!("in[{}]", i),
                width: inputs,
            }),
            Expr::Output(i) if *i >= outputs => Err(CosimError::PinOutOfRange {
                component: component.to_string(),
                pin: format!("out[{}]", i),
                width: outputs,
            }),
            Expr::Input(_) | Expr::Output(_) | Expr::Literal(_) => Ok(()),
            Expr::Not(inner) => inner.check_widths(inputs, outputs, component),
            Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) | Expr::Xor(lhs, rhs) => {
                lhs.check_widths(inputs, outputs, component)?;
                rhs.check_widths(inputs, outputs, component)
            }
        }
    }
}

/// One routine statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `out[pin] = expr`
    Assign { pin: usize, expr: Expr },
    /// `log ["label"] [expr]`
    Log {
        label: Option<String>,
        expr: Option<Expr>,
    },
}

/// A compiled logic routine: the crate's shipped [`LogicProvider`].
///
/// Compiled once at bridge construction; evaluation per solver iteration is
/// infallible because pin indices are validated against the component's
/// declared widths up front.
///
/// [`LogicProvider`]: super::LogicProvider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutineProgram {
    pub(crate) stmts: Vec<Stmt>,
}

impl RoutineProgram {
    /// Compile routine source text.
    pub fn compile(source: &str) -> Result<Self> {
        super::parser::parse(source)
    }

    /// Validate every pin reference against the component's declared widths.
    pub fn check_widths(&self, inputs: usize, outputs: usize, component: &str) -> Result<()> {
        for stmt in &self.stmts {
            match stmt {
                Stmt::Assign { pin, expr } => {
                    if *pin >= outputs {
                        return Err(CosimError::PinOutOfRange {
                            component: component.to_string(),
                            pin: format!("out[{}]", pin),
                            width: outputs,
                        });
                    }
                    expr.check_widths(inputs, outputs, component)?;
                }
                Stmt::Log { expr, .. } => {
                    if let Some(expr) = expr {
                        expr.check_widths(inputs, outputs, component)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Run the routine against the bridge's pin handle.
    pub fn run(&self, pins: &mut dyn PinAccess) {
        for stmt in &self.stmts {
            match stmt {
                Stmt::Assign { pin, expr } => {
                    let state = expr.eval(pins);
                    pins.set_output(*pin, state);
                }
                Stmt::Log { label, expr } => {
                    let mut message = label.clone().unwrap_or_default();
                    if let Some(expr) = expr {
                        if !message.is_empty() {
                            message.push(' ');
                        }
                        message.push(if expr.eval(pins) { '1' } else { '0' });
                    }
                    pins.log(&message);
                }
            }
        }
    }
}
