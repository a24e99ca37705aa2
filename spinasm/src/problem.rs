//! Mutable QUBO/Ising problem over dense variable indices.

use crate::symbols::Remap;
use crate::{Expr, Mode, Spin};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Unordered pair of distinct indices, stored low-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pair(usize, usize);

impl Pair {
    pub fn new(a: usize, b: usize) -> Self {
        debug_assert!(a != b, "pair endpoints must differ");
        if a < b {
            Pair(a, b)
        } else {
            Pair(b, a)
        }
    }

    pub fn lo(&self) -> usize {
        self.0
    }

    pub fn hi(&self) -> usize {
        self.1
    }

    pub fn contains(&self, i: usize) -> bool {
        self.0 == i || self.1 == i
    }

    /// The endpoint that is not `i`.
    pub fn other(&self, i: usize) -> usize {
        if self.0 == i {
            self.1
        } else {
            self.0
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Problem {
    pub mode: Mode,
    pub weights: BTreeMap<usize, f64>,
    pub strengths: BTreeMap<Pair, f64>,
    pub chains: BTreeSet<Pair>,
    pub pinned: BTreeMap<usize, Spin>,
    /// helper index -> the user index it pins
    pub pin_helpers: BTreeMap<usize, usize>,
    pub assertions: Vec<Expr>,
    pub known_values: BTreeMap<String, Spin>,
    pub simple_offset: f64,
}

impl Problem {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn weight(&self, i: usize) -> f64 {
        self.weights.get(&i).copied().unwrap_or(0.0)
    }

    pub fn strength(&self, a: usize, b: usize) -> f64 {
        self.strengths.get(&Pair::new(a, b)).copied().unwrap_or(0.0)
    }

    pub fn add_weight(&mut self, i: usize, w: f64) {
        *self.weights.entry(i).or_insert(0.0) += w;
    }

    /// Add a quadratic term; a term on a single variable collapses to the
    /// weight (QUBO, `x*x = x`) or the offset (Ising, `s*s = 1`).
    pub fn add_strength(&mut self, a: usize, b: usize, j: f64) {
        if a == b {
            match self.mode {
                Mode::Qubo => self.add_weight(a, j),
                Mode::Ising => self.simple_offset += j,
            }
            return;
        }
        *self.strengths.entry(Pair::new(a, b)).or_insert(0.0) += j;
    }

    /// Strengths touching `i`, as (neighbor, coupling).
    pub fn incident(&self, i: usize) -> Vec<(usize, f64)> {
        self.strengths
            .iter()
            .filter(|(p, _)| p.contains(i))
            .map(|(p, &j)| (p.other(i), j))
            .collect()
    }

    pub fn in_chain(&self, i: usize) -> bool {
        self.chains.iter().any(|p| p.contains(i))
    }

    /// Every index mentioned by weights, strengths, chains or pins.
    pub fn active_indices(&self) -> BTreeSet<usize> {
        let mut out: BTreeSet<usize> = self.weights.keys().copied().collect();
        for p in self.strengths.keys().chain(self.chains.iter()) {
            out.insert(p.lo());
            out.insert(p.hi());
        }
        out.extend(self.pinned.keys().copied());
        out
    }

    pub fn max_abs_weight(&self) -> f64 {
        self.weights.values().fold(0.0, |m, w| m.max(w.abs()))
    }

    pub fn max_abs_strength(&self) -> f64 {
        self.strengths.values().fold(0.0, |m, j| m.max(j.abs()))
    }

    /// Drop zero coefficients left behind by cancellation.
    pub fn prune_zeros(&mut self) {
        self.weights.retain(|_, w| *w != 0.0);
        self.strengths.retain(|_, j| *j != 0.0);
    }

    /// Objective value of a full assignment, offset included.
    pub fn energy(&self, spins: &BTreeMap<usize, Spin>) -> f64 {
        let val = |i: usize| spins.get(&i).map(|s| s.in_mode(self.mode)).unwrap_or(0.0);
        let lin: f64 = self.weights.iter().map(|(&i, w)| w * val(i)).sum();
        let quad: f64 = self
            .strengths
            .iter()
            .map(|(p, j)| j * val(p.lo()) * val(p.hi()))
            .sum();
        lin + quad + self.simple_offset
    }

    /// Ising form of this problem (`x = (s + 1) / 2`).
    pub fn to_ising(&self) -> Problem {
        if self.mode == Mode::Ising {
            return self.clone();
        }
        let mut out = self.without_terms(Mode::Ising);
        for (&i, &a) in &self.weights {
            out.add_weight(i, a / 2.0);
            out.simple_offset += a / 2.0;
        }
        for (&p, &b) in &self.strengths {
            out.add_strength(p.lo(), p.hi(), b / 4.0);
            out.add_weight(p.lo(), b / 4.0);
            out.add_weight(p.hi(), b / 4.0);
            out.simple_offset += b / 4.0;
        }
        out
    }

    /// QUBO form of this problem (`s = 2x - 1`).
    pub fn to_qubo(&self) -> Problem {
        if self.mode == Mode::Qubo {
            return self.clone();
        }
        let mut out = self.without_terms(Mode::Qubo);
        for (&i, &h) in &self.weights {
            out.add_weight(i, 2.0 * h);
            out.simple_offset -= h;
        }
        for (&p, &j) in &self.strengths {
            out.add_strength(p.lo(), p.hi(), 4.0 * j);
            out.add_weight(p.lo(), -2.0 * j);
            out.add_weight(p.hi(), -2.0 * j);
            out.simple_offset += j;
        }
        out
    }

    fn without_terms(&self, mode: Mode) -> Problem {
        Problem {
            mode,
            weights: BTreeMap::new(),
            strengths: BTreeMap::new(),
            chains: self.chains.clone(),
            pinned: self.pinned.clone(),
            pin_helpers: self.pin_helpers.clone(),
            assertions: self.assertions.clone(),
            known_values: self.known_values.clone(),
            simple_offset: self.simple_offset,
        }
    }

    /// Rewrite every index through `remap`; retired indices must already be gone.
    pub fn apply_remap(&mut self, remap: &Remap) {
        let re = |i: usize| remap.get(i);
        self.weights = std::mem::take(&mut self.weights)
            .into_iter()
            .filter_map(|(i, w)| re(i).map(|n| (n, w)))
            .collect();
        self.strengths = std::mem::take(&mut self.strengths)
            .into_iter()
            .filter_map(|(p, j)| Some((Pair::new(re(p.lo())?, re(p.hi())?), j)))
            .collect();
        self.chains = std::mem::take(&mut self.chains)
            .into_iter()
            .filter_map(|p| Some(Pair::new(re(p.lo())?, re(p.hi())?)))
            .collect();
        self.pinned = std::mem::take(&mut self.pinned)
            .into_iter()
            .filter_map(|(i, s)| re(i).map(|n| (n, s)))
            .collect();
        self.pin_helpers = std::mem::take(&mut self.pin_helpers)
            .into_iter()
            .filter_map(|(h, u)| Some((re(h)?, re(u)?)))
            .collect();
    }
}
