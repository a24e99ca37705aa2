//! Solver backend interface.

use crate::physical::PhysicalProblem;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostProcessing {
    #[default]
    None,
    Sampling,
    Optimization,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveParams {
    pub sample_count: usize,
    /// Microseconds.
    pub anneal_time: f64,
    pub spin_reversal_transforms: usize,
    pub postprocessing: PostProcessing,
    /// Ask the backend to drop samples with broken chains.
    pub discard_broken: bool,
}

impl Default for SolveParams {
    fn default() -> Self {
        Self {
            sample_count: 1000,
            anneal_time: 20.0,
            spin_reversal_transforms: 0,
            postprocessing: PostProcessing::None,
            discard_broken: false,
        }
    }
}

/// Samples returned by a backend. `spin_vectors[k][q]` is the spin of qubit
/// id `q` in sample `k`; qubits the problem does not use may hold any value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResults {
    pub spin_vectors: Vec<Vec<i8>>,
    pub energies: Vec<f64>,
    pub occurrence_counts: Vec<u64>,
    /// Samples the backend discarded for broken chains.
    pub broken_count: u64,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BackendError {
    #[error("solver timed out after {0} s")]
    Timeout(f64),

    #[error("connection to solver failed: {0}")]
    Connection(String),

    #[error("solver rejected the problem: {0}")]
    Rejected(String),

    #[error("malformed solver response: {0}")]
    Malformed(String),
}

pub trait Solver {
    fn solve(&self, problem: &PhysicalProblem, params: &SolveParams) -> Result<RawResults, BackendError>;
}

impl RawResults {
    /// Check the parallel vectors line up.
    pub fn check(&self) -> Result<(), BackendError> {
        let n = self.spin_vectors.len();
        if self.energies.len() != n || self.occurrence_counts.len() != n {
            return Err(BackendError::Malformed(format!(
                "{} samples, {} energies, {} occurrence counts",
                n,
                self.energies.len(),
                self.occurrence_counts.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_from_partial_json() {
        let p: SolveParams = serde_json::from_str(r#"{"sample_count": 10, "postprocessing": "sampling"}"#).unwrap();
        assert_eq!(p.sample_count, 10);
        assert_eq!(p.postprocessing, PostProcessing::Sampling);
        assert_eq!(p.anneal_time, SolveParams::default().anneal_time);
    }

    #[test]
    fn test_mismatched_results() {
        let r = RawResults {
            spin_vectors: vec![vec![1, -1]],
            energies: vec![],
            occurrence_counts: vec![1],
            broken_count: 0,
        };
        assert!(matches!(r.check(), Err(BackendError::Malformed(_))));
    }
}
