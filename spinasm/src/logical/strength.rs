//! Chain and pin strength scheduling.

use crate::problem::Problem;
use crate::symbols::SymbolTable;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Chain strength is this many times the largest coefficient magnitude.
pub const CHAIN_MULTIPLIER: f64 = 2.0;
/// Pin strength is this many times the chain strength.
pub const PIN_MULTIPLIER: f64 = 2.0;
/// Magnitude assumed when the problem has no coefficients at all.
pub const DEFAULT_MAGNITUDE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Strengths {
    pub chain: f64,
    pub pin: f64,
}

/// Compute chain and pin strengths; caller-supplied values are used as given.
pub fn assign_strengths(problem: &Problem, chain: Option<f64>, pin: Option<f64>) -> Strengths {
    let chain = chain.unwrap_or_else(|| {
        let mag = problem.max_abs_weight().max(problem.max_abs_strength());
        let mag = if mag == 0.0 { DEFAULT_MAGNITUDE } else { mag };
        -mag * CHAIN_MULTIPLIER
    });
    let pin = pin.unwrap_or(chain * PIN_MULTIPLIER);
    debug!(chain, pin, "strengths assigned");
    Strengths { chain, pin }
}

/// Give every user pin a helper variable pinned to the same value and
/// coupled to the user variable with `pin_strength`.
pub fn pin_with_helpers(problem: &mut Problem, symbols: &mut SymbolTable, pin_strength: f64) {
    let user_pins: Vec<_> = problem
        .pinned
        .iter()
        .filter(|(i, _)| !problem.pin_helpers.contains_key(*i))
        .map(|(&i, &s)| (i, s))
        .collect();
    for (i, spin) in user_pins {
        let (_, helper) = symbols.fresh_internal("pin");
        problem.add_weight(helper, pin_strength * spin.value());
        problem.add_strength(i, helper, pin_strength);
        problem.pinned.insert(helper, spin);
        problem.pin_helpers.insert(helper, i);
    }
}
