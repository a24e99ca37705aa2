//! Compile symbolic spin programs onto fixed-topology annealing hardware.
//!
//! A program is an ordered list of [`Stmt`]s over named binary variables. The
//! pipeline folds it into a logical [`problem::Problem`], schedules chain and
//! pin strengths, simplifies, embeds the result onto a [`embed::TargetGraph`],
//! reconciles a [`physical::PhysicalProblem`] and finally decodes raw solver
//! samples back into named assignments.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod assertion;
pub mod backend;
pub mod config;
pub mod decode;
pub mod embed;
pub mod emit;
pub mod error;
pub mod logical;
pub mod physical;
pub mod pipeline;
pub mod problem;
pub mod stats;
pub mod symbols;

pub use config::CompileOptions;
pub use error::CompileError;
pub use pipeline::{Compiled, Compiler};

/// One statement of a spin program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// Linear term on a single variable.
    Weight { var: String, value: f64 },
    /// Quadratic term between two variables.
    Strength { a: String, b: String, value: f64 },
    /// Both variables must take the same value.
    Chain { a: String, b: String },
    /// Force a variable to a fixed value (`true` is spin +1, bit 1).
    Pin { var: String, value: bool },
    /// Boolean expression checked against every decoded solution.
    Assert(Expr),
}

impl Stmt {
    pub fn weight(var: impl Into<String>, value: f64) -> Self {
        Stmt::Weight {
            var: var.into(),
            value,
        }
    }

    pub fn strength(a: impl Into<String>, b: impl Into<String>, value: f64) -> Self {
        Stmt::Strength {
            a: a.into(),
            b: b.into(),
            value,
        }
    }

    pub fn chain(a: impl Into<String>, b: impl Into<String>) -> Self {
        Stmt::Chain {
            a: a.into(),
            b: b.into(),
        }
    }

    pub fn pin(var: impl Into<String>, value: bool) -> Self {
        Stmt::Pin {
            var: var.into(),
            value,
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Weight { var, value } => write!(f, "{} {}", var, value),
            Stmt::Strength { a, b, value } => write!(f, "{} {} {}", a, b, value),
            Stmt::Chain { a, b } => write!(f, "{} = {}", a, b),
            Stmt::Pin { var, value } => write!(f, "{} := {}", var, value),
            Stmt::Assert(e) => write!(f, "!assert {}", e),
        }
    }
}

/// Assertion expression over named bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    Num(i64),
    Var(String),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn unary(op: UnOp, e: Expr) -> Self {
        Expr::Unary(op, Box::new(e))
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }
}

/// A spin value in the Ising domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Spin {
    Down,
    Up,
}

impl Spin {
    pub fn from_bool(b: bool) -> Self {
        if b {
            Spin::Up
        } else {
            Spin::Down
        }
    }

    /// Interpret a raw solver value; anything other than +1/-1 is unusable.
    pub fn from_raw(v: i8) -> Option<Self> {
        match v {
            1 => Some(Spin::Up),
            -1 => Some(Spin::Down),
            _ => None,
        }
    }

    pub fn value(self) -> f64 {
        match self {
            Spin::Up => 1.0,
            Spin::Down => -1.0,
        }
    }

    pub fn as_raw(self) -> i8 {
        match self {
            Spin::Up => 1,
            Spin::Down => -1,
        }
    }

    pub fn as_bit(self) -> bool {
        self == Spin::Up
    }

    /// Value of the variable in the given domain (bit for QUBO, spin for Ising).
    pub fn in_mode(self, mode: Mode) -> f64 {
        match mode {
            Mode::Ising => self.value(),
            Mode::Qubo => {
                if self.as_bit() {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

impl std::ops::Neg for Spin {
    type Output = Spin;
    fn neg(self) -> Spin {
        match self {
            Spin::Up => Spin::Down,
            Spin::Down => Spin::Up,
        }
    }
}

/// Variable domain of a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Variables in {0, 1}.
    Qubo,
    /// Variables in {-1, +1}.
    #[default]
    Ising,
}
