//! Logical problem construction: building, strength scheduling and simplification.

mod builder;
mod error;
pub mod simplify;
pub mod strength;

pub use builder::build_problem;
pub use error::{BuildError, SimplifyError};
pub use simplify::{simplify, SimplifyReport};
pub use strength::{assign_strengths, pin_with_helpers, Strengths};

use crate::problem::Problem;
use crate::symbols::SymbolTable;

/// True when nothing is left to optimize.
pub fn is_degenerate(problem: &Problem) -> bool {
    problem.weights.values().all(|w| *w == 0.0) && problem.strengths.values().all(|j| *j == 0.0)
}

/// Names of variables that have neither a coupling nor a chain.
pub fn find_disconnected(problem: &Problem, symbols: &SymbolTable) -> Vec<String> {
    let mut connected = vec![false; symbols.len()];
    for p in problem
        .strengths
        .iter()
        .filter(|(_, j)| **j != 0.0)
        .map(|(p, _)| p)
        .chain(problem.chains.iter())
    {
        for i in [p.lo(), p.hi()] {
            if let Some(c) = connected.get_mut(i) {
                *c = true;
            }
        }
    }
    let mut out: Vec<String> = connected
        .iter()
        .enumerate()
        .filter(|(_, c)| !**c)
        .flat_map(|(i, _)| symbols.names_of(i))
        .map(str::to_string)
        .collect();
    out.sort();
    out
}
