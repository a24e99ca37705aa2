//! Exact rewrites that shrink the logical problem.
//!
//! Chains become aliases and variables whose value is forced are folded into
//! the offset and their neighbors' weights. Indices are renumbered once, after
//! both passes reach a fixed point.
//!
//! A pinned variable whose only neighbors are its own pin helpers is always
//! forced. Variables whose linear term outweighs every coupling they take
//! part in are forced only when `fold_dominated` is set.

use crate::logical::error::SimplifyError;
use crate::problem::{Pair, Problem};
use crate::symbols::SymbolTable;
use crate::{Mode, Spin};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Margin by which a linear term must dominate before its value is fixed.
const DOMINANCE_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplifyReport {
    pub vars_before: usize,
    pub vars_after: usize,
    pub aliased: usize,
    pub fixed: usize,
}

/// Run chain aliasing and constant propagation, then compact indices.
pub fn simplify(
    problem: &mut Problem,
    symbols: &mut SymbolTable,
    fold_dominated: bool,
) -> Result<SimplifyReport, SimplifyError> {
    let vars_before = symbols.len();
    problem.prune_zeros();
    let aliased = alias_chains(problem, symbols)?;
    let fixed = propagate_constants(problem, symbols, fold_dominated)?;
    let remap = symbols.compact();
    problem.apply_remap(&remap);
    problem.prune_zeros();
    let report = SimplifyReport {
        vars_before,
        vars_after: symbols.len(),
        aliased,
        fixed,
    };
    debug!(?report, "simplified");
    Ok(report)
}

/// Replace every chain by an alias, lowest pair first. Returns the number of merges.
pub fn alias_chains(
    problem: &mut Problem,
    symbols: &mut SymbolTable,
) -> Result<usize, SimplifyError> {
    let mut merged = 0;
    while let Some(p) = problem.chains.pop_first() {
        merge_into(problem, symbols, p.lo(), p.hi())?;
        merged += 1;
    }
    Ok(merged)
}

fn merge_into(
    problem: &mut Problem,
    symbols: &mut SymbolTable,
    keep: usize,
    drop: usize,
) -> Result<(), SimplifyError> {
    trace!(keep, drop, "alias");
    if let Some(sd) = problem.pinned.remove(&drop) {
        match problem.pinned.get(&keep) {
            Some(&sk) if sk != sd => {
                let mut names: Vec<&str> = symbols.names_of(keep);
                names.extend(symbols.names_of(drop));
                return Err(SimplifyError::Contradiction {
                    names: names.join(", "),
                    first: sk.as_bit(),
                    second: sd.as_bit(),
                });
            }
            _ => {
                problem.pinned.insert(keep, sd);
            }
        }
    }
    if let Some(w) = problem.weights.remove(&drop) {
        problem.add_weight(keep, w);
    }
    let touching: Vec<Pair> = problem
        .strengths
        .keys()
        .filter(|p| p.contains(drop))
        .copied()
        .collect();
    for p in touching {
        if let Some(j) = problem.strengths.remove(&p) {
            problem.add_strength(keep, p.other(drop), j);
        }
    }
    let chained: Vec<Pair> = problem
        .chains
        .iter()
        .filter(|p| p.contains(drop))
        .copied()
        .collect();
    for p in chained {
        problem.chains.remove(&p);
        let other = p.other(drop);
        if other != keep {
            problem.chains.insert(Pair::new(keep, other));
        }
    }
    for user in problem.pin_helpers.values_mut() {
        if *user == drop {
            *user = keep;
        }
    }
    if let Some(user) = problem.pin_helpers.remove(&drop) {
        if user != keep {
            problem.pin_helpers.insert(keep, user);
        }
    }
    symbols.merge(keep, drop)?;
    Ok(())
}

/// Value an index must take in every optimal assignment, if that is evident locally.
fn forced_value(problem: &Problem, i: usize, fold_dominated: bool) -> Option<Spin> {
    let nbrs = problem.incident(i);
    if let Some(&pin) = problem.pinned.get(&i) {
        if nbrs
            .iter()
            .all(|(n, _)| problem.pin_helpers.get(n) == Some(&i))
        {
            return Some(pin);
        }
    }
    if !fold_dominated {
        return None;
    }
    let h = problem.weight(i);
    match problem.mode {
        Mode::Ising => {
            let bound: f64 = nbrs.iter().map(|(_, j)| j.abs()).sum();
            if h.abs() - bound > DOMINANCE_EPS {
                Some(if h > 0.0 { Spin::Down } else { Spin::Up })
            } else {
                None
            }
        }
        Mode::Qubo => {
            let lo: f64 = h + nbrs.iter().map(|(_, b)| b.min(0.0)).sum::<f64>();
            let hi: f64 = h + nbrs.iter().map(|(_, b)| b.max(0.0)).sum::<f64>();
            if lo > DOMINANCE_EPS {
                Some(Spin::Down)
            } else if hi < -DOMINANCE_EPS {
                Some(Spin::Up)
            } else {
                None
            }
        }
    }
}

/// Fix forced variables until nothing changes. Returns the number fixed.
pub fn propagate_constants(
    problem: &mut Problem,
    symbols: &mut SymbolTable,
    fold_dominated: bool,
) -> Result<usize, SimplifyError> {
    let mut fixed = 0;
    loop {
        let mut changed = false;
        for i in problem.active_indices() {
            if problem.in_chain(i) {
                continue;
            }
            let Some(spin) = forced_value(problem, i, fold_dominated) else {
                continue;
            };
            if let Some(&pin) = problem.pinned.get(&i) {
                if pin != spin {
                    return Err(SimplifyError::Contradiction {
                        names: symbols.names_of(i).join(", "),
                        first: pin.as_bit(),
                        second: spin.as_bit(),
                    });
                }
            }
            fix(problem, symbols, i, spin)?;
            fixed += 1;
            changed = true;
        }
        if !changed {
            break;
        }
    }
    Ok(fixed)
}

fn fix(
    problem: &mut Problem,
    symbols: &mut SymbolTable,
    i: usize,
    spin: Spin,
) -> Result<(), SimplifyError> {
    let v = spin.in_mode(problem.mode);
    let w = problem.weights.remove(&i).unwrap_or(0.0);
    problem.simple_offset += w * v;
    for (n, j) in problem.incident(i) {
        problem.strengths.remove(&Pair::new(i, n));
        problem.add_weight(n, j * v);
    }
    problem.pinned.remove(&i);
    problem.pin_helpers.remove(&i);
    problem.pin_helpers.retain(|_, user| *user != i);
    for name in symbols.retire(i)? {
        trace!(%name, ?spin, "fixed");
        problem.known_values.insert(name, spin);
    }
    Ok(())
}
