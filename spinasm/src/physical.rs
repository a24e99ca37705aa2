//! Physical problem: logical coefficients placed onto qubits and couplers.

use crate::embed::{EmbedError, Embedding, TargetGraph};
use crate::problem::{Pair, Problem};
use crate::Spin;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Largest absolute weight and strength a backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoefficientLimits {
    pub weight: f64,
    pub strength: f64,
}

impl CoefficientLimits {
    pub fn uniform(limit: f64) -> Self {
        Self {
            weight: limit,
            strength: limit,
        }
    }
}

impl Default for CoefficientLimits {
    fn default() -> Self {
        Self {
            weight: 2.0,
            strength: 1.0,
        }
    }
}

/// Ising problem over physical qubit ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalProblem {
    pub weights: BTreeMap<usize, f64>,
    /// User strengths and chain couplings, merged by addition.
    pub strengths: BTreeMap<Pair, f64>,
    /// Couplers that hold a chain together.
    pub chains: BTreeSet<Pair>,
    pub embedding: Embedding,
    /// Not affected by scaling.
    pub simple_offset: f64,
    /// Product of every scaling factor applied so far.
    pub scale_factor: f64,
}

impl Default for PhysicalProblem {
    fn default() -> Self {
        Self {
            weights: BTreeMap::new(),
            strengths: BTreeMap::new(),
            chains: BTreeSet::new(),
            embedding: Embedding::default(),
            simple_offset: 0.0,
            scale_factor: 1.0,
        }
    }
}

/// Lowest `(min, max)` qubit pair joining two chains.
fn coupler(a: &[usize], b: &[usize], target: &TargetGraph) -> Option<Pair> {
    a.iter()
        .flat_map(|&qa| b.iter().map(move |&qb| Pair::new(qa, qb)))
        .filter(|p| target.has_edge(p.lo(), p.hi()))
        .min()
}

impl PhysicalProblem {
    /// Map a logical problem through `embedding`. Weights go to the lowest
    /// qubit of each chain; strengths go to the lowest coupler between two
    /// chains; every target edge inside a chain gets `chain_strength`.
    pub fn reconcile(
        logical: &Problem,
        embedding: &Embedding,
        target: &TargetGraph,
        chain_strength: f64,
    ) -> Result<Self, EmbedError> {
        let logical = logical.to_ising();
        let mut out = Self {
            embedding: embedding.clone(),
            simple_offset: logical.simple_offset,
            ..Self::default()
        };
        let chain = |i: usize| {
            let c = embedding.chain(i);
            if c.is_empty() {
                Err(EmbedError::Invalid(format!("variable {i} has no chain")))
            } else {
                Ok(c)
            }
        };

        for (&i, &w) in &logical.weights {
            if w == 0.0 {
                continue;
            }
            *out.weights.entry(chain(i)?[0]).or_insert(0.0) += w;
        }
        for (p, &j) in &logical.strengths {
            if j == 0.0 {
                continue;
            }
            let edge = coupler(chain(p.lo())?, chain(p.hi())?, target).ok_or_else(|| {
                EmbedError::Invalid(format!("no coupler between chains of {} and {}", p.lo(), p.hi()))
            })?;
            *out.strengths.entry(edge).or_insert(0.0) += j;
        }
        for c in embedding.chains() {
            for (k, &a) in c.iter().enumerate() {
                for &b in &c[k + 1..] {
                    if target.has_edge(a, b) {
                        let edge = Pair::new(a, b);
                        *out.strengths.entry(edge).or_insert(0.0) += chain_strength;
                        out.chains.insert(edge);
                    }
                }
            }
        }
        for p in &logical.chains {
            let edge = coupler(chain(p.lo())?, chain(p.hi())?, target).ok_or_else(|| {
                EmbedError::Invalid(format!("no coupler for chain {} = {}", p.lo(), p.hi()))
            })?;
            *out.strengths.entry(edge).or_insert(0.0) += chain_strength;
            out.chains.insert(edge);
        }
        out.strengths.retain(|_, j| *j != 0.0);
        debug!(
            qubits = embedding.total_qubits(),
            weights = out.weights.len(),
            couplers = out.strengths.len(),
            chain_couplers = out.chains.len(),
            "physical problem reconciled"
        );
        Ok(out)
    }

    pub fn max_abs_weight(&self) -> f64 {
        self.weights.values().fold(0.0, |m, w| m.max(w.abs()))
    }

    pub fn max_abs_strength(&self) -> f64 {
        self.strengths.values().fold(0.0, |m, j| m.max(j.abs()))
    }

    /// Uniformly shrink weights and strengths into `limits`. Returns the
    /// factor applied, 1.0 when everything already fits.
    pub fn scale(&mut self, limits: CoefficientLimits) -> f64 {
        let ratio = |limit: f64, max: f64| if max > 0.0 { limit / max } else { f64::INFINITY };
        let factor = ratio(limits.weight, self.max_abs_weight())
            .min(ratio(limits.strength, self.max_abs_strength()));
        if factor >= 1.0 {
            return 1.0;
        }
        for w in self.weights.values_mut() {
            *w *= factor;
        }
        for j in self.strengths.values_mut() {
            *j *= factor;
        }
        self.scale_factor *= factor;
        debug!(factor, "physical coefficients scaled");
        factor
    }

    /// Qubits carrying a chain, a weight or a coupler.
    pub fn qubits(&self) -> BTreeSet<usize> {
        let mut out: BTreeSet<usize> = self.embedding.chains().iter().flatten().copied().collect();
        out.extend(self.weights.keys().copied());
        for p in self.strengths.keys() {
            out.insert(p.lo());
            out.insert(p.hi());
        }
        out
    }

    /// Energy of an assignment as a backend would report it: scaled
    /// coefficients, no offset.
    pub fn sample_energy(&self, spins: &BTreeMap<usize, Spin>) -> f64 {
        let val = |q: usize| spins.get(&q).map(|s| s.value()).unwrap_or(0.0);
        let lin: f64 = self.weights.iter().map(|(&q, w)| w * val(q)).sum();
        let quad: f64 = self
            .strengths
            .iter()
            .map(|(p, j)| j * val(p.lo()) * val(p.hi()))
            .sum();
        lin + quad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mode;
    use proptest::prelude::*;

    fn all_assignments(qubits: &[usize]) -> Vec<BTreeMap<usize, Spin>> {
        (0..1u32 << qubits.len())
            .map(|bits| {
                qubits
                    .iter()
                    .enumerate()
                    .map(|(k, &q)| (q, Spin::from_bool(bits >> k & 1 == 1)))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_reconcile_places_terms_once() {
        // variable 0 on qubits {0, 4}, variable 1 on {5}
        let target = TargetGraph::chimera(1, 1, 4);
        let embedding = Embedding::new(vec![vec![4, 0], vec![5]]);
        let mut p = Problem::new(Mode::Ising);
        p.add_weight(0, 1.5);
        p.add_weight(1, -0.5);
        p.add_strength(0, 1, 0.25);
        p.simple_offset = 3.0;

        let phys = PhysicalProblem::reconcile(&p, &embedding, &target, -2.0).unwrap();
        assert_eq!(phys.weights, BTreeMap::from([(0, 1.5), (5, -0.5)]));
        // qubit 0 (side 0) couples to 5 (side 1) directly
        assert_eq!(phys.strengths[&Pair::new(0, 5)], 0.25);
        assert_eq!(phys.strengths[&Pair::new(0, 4)], -2.0);
        assert_eq!(phys.chains, BTreeSet::from([Pair::new(0, 4)]));
        assert_eq!(phys.simple_offset, 3.0);
        assert_eq!(phys.scale_factor, 1.0);
    }

    #[test]
    fn test_surviving_chain_adds_to_existing_coupler() {
        let target = TargetGraph::from_edges([(0, 1)]);
        let embedding = Embedding::new(vec![vec![0], vec![1]]);
        let mut p = Problem::new(Mode::Ising);
        p.add_strength(0, 1, 0.5);
        p.chains.insert(Pair::new(0, 1));
        let phys = PhysicalProblem::reconcile(&p, &embedding, &target, -2.0).unwrap();
        assert_eq!(phys.strengths[&Pair::new(0, 1)], -1.5);
        assert!(phys.chains.contains(&Pair::new(0, 1)));
    }

    #[test]
    fn test_missing_coupler_is_invalid() {
        let target = TargetGraph::from_edges([(0, 1), (1, 2)]);
        let embedding = Embedding::new(vec![vec![0], vec![2]]);
        let mut p = Problem::new(Mode::Ising);
        p.add_strength(0, 1, 1.0);
        let err = PhysicalProblem::reconcile(&p, &embedding, &target, -1.0).unwrap_err();
        assert!(matches!(err, EmbedError::Invalid(_)));
    }

    #[test]
    fn test_scale_hits_binding_limit() {
        let mut phys = PhysicalProblem::default();
        phys.weights.insert(0, 4.0);
        phys.strengths.insert(Pair::new(0, 1), -1.0);
        phys.simple_offset = 7.0;
        let f = phys.scale(CoefficientLimits::default());
        assert_eq!(f, 0.5);
        assert_eq!(phys.weights[&0], 2.0);
        assert_eq!(phys.strengths[&Pair::new(0, 1)], -0.5);
        assert_eq!(phys.simple_offset, 7.0);
        assert_eq!(phys.scale_factor, 0.5);
        // already within limits
        assert_eq!(phys.scale(CoefficientLimits::default()), 1.0);
    }

    proptest! {
        #[test]
        fn prop_scaling_keeps_minimizers(
            weights in prop::collection::vec(-6.0f64..6.0, 4),
            strengths in prop::collection::vec(-6.0f64..6.0, 6),
            limit in 0.1f64..2.0,
        ) {
            let mut phys = PhysicalProblem::default();
            for (q, w) in weights.into_iter().enumerate() {
                phys.weights.insert(q, w);
            }
            let pairs = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
            for (&(a, b), j) in pairs.iter().zip(strengths) {
                phys.strengths.insert(Pair::new(a, b), j);
            }
            let assignments = all_assignments(&[0, 1, 2, 3]);
            let before: Vec<f64> = assignments.iter().map(|s| phys.sample_energy(s)).collect();
            let f = phys.scale(CoefficientLimits::uniform(limit));
            let after: Vec<f64> = assignments.iter().map(|s| phys.sample_energy(s)).collect();

            prop_assert!(phys.max_abs_weight() <= limit + 1e-9);
            prop_assert!(phys.max_abs_strength() <= limit + 1e-9);
            let min_before = before.iter().cloned().fold(f64::INFINITY, f64::min);
            let min_after = after.iter().cloned().fold(f64::INFINITY, f64::min);
            for (b, a) in before.iter().zip(&after) {
                prop_assert!((a - b * f).abs() < 1e-9);
                if (b - min_before).abs() < 1e-9 {
                    prop_assert!((a - min_after).abs() < 1e-9);
                }
            }
        }
    }
}
