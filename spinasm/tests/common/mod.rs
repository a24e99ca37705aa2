#![allow(dead_code)]

use spinasm::backend::{BackendError, RawResults, SolveParams, Solver};
use spinasm::physical::PhysicalProblem;
use spinasm::Spin;
use std::collections::BTreeMap;

const MAX_QUBITS: usize = 20;

/// Enumerates every assignment of the qubits a problem uses and returns the
/// `sample_count` lowest, one occurrence each. Unused qubits read as +1.
pub struct ExhaustiveSolver;

impl Solver for ExhaustiveSolver {
    fn solve(&self, problem: &PhysicalProblem, params: &SolveParams) -> Result<RawResults, BackendError> {
        let qubits: Vec<usize> = problem.qubits().into_iter().collect();
        if qubits.len() > MAX_QUBITS {
            return Err(BackendError::Rejected(format!("{} qubits is too many to enumerate", qubits.len())));
        }
        let width = qubits.last().map_or(0, |q| q + 1);

        let mut samples: Vec<(f64, Vec<i8>)> = (0..1u64 << qubits.len())
            .map(|mask| {
                let spins: BTreeMap<usize, Spin> = qubits
                    .iter()
                    .enumerate()
                    .map(|(k, &q)| (q, Spin::from_bool(mask >> k & 1 == 1)))
                    .collect();
                let mut raw = vec![1i8; width];
                for (&q, s) in &spins {
                    raw[q] = s.as_raw();
                }
                (problem.sample_energy(&spins), raw)
            })
            .collect();
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        samples.truncate(params.sample_count);

        Ok(RawResults {
            energies: samples.iter().map(|s| s.0).collect(),
            occurrence_counts: vec![1; samples.len()],
            spin_vectors: samples.into_iter().map(|s| s.1).collect(),
            broken_count: 0,
        })
    }
}

/// Always fails, for error propagation tests.
pub struct DownSolver;

impl Solver for DownSolver {
    fn solve(&self, _: &PhysicalProblem, _: &SolveParams) -> Result<RawResults, BackendError> {
        Err(BackendError::Connection("solver unreachable".into()))
    }
}

/// Raw vector of `len` spins with the given qubits set.
pub fn raw_sample(len: usize, set: &[(usize, i8)]) -> Vec<i8> {
    let mut v = vec![1i8; len];
    for &(q, s) in set {
        v[q] = s;
    }
    v
}
