//! Topology-agnostic embedding: several independently seeded routing trials,
//! run in parallel, keeping the smallest result.

use super::route::{route, RouteParams, Unbiased, PATIENCE};
use super::{CancelToken, EmbedError, Embedder, Embedding, LogicalGraph, TargetGraph};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::debug;

pub const DENSE_TRIALS: usize = 10;
pub const DEFAULT_MAX_ROUNDS: usize = 32;

#[derive(Debug, Clone)]
pub struct DenseEmbedder {
    pub trials: usize,
    pub seed: u64,
    pub max_rounds: usize,
}

impl Default for DenseEmbedder {
    fn default() -> Self {
        Self {
            trials: DENSE_TRIALS,
            seed: 0,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

impl Embedder for DenseEmbedder {
    fn name(&self) -> &'static str {
        "dense"
    }

    fn embed(
        &self,
        logical: &LogicalGraph,
        target: &TargetGraph,
        cancel: &CancelToken,
    ) -> Result<Embedding, EmbedError> {
        let params = RouteParams {
            max_rounds: self.max_rounds,
            patience: PATIENCE,
        };
        let trials = self.trials.max(1);
        let results: Vec<Option<Vec<Vec<usize>>>> = (0..trials)
            .into_par_iter()
            .map(|t| {
                let seed = self.seed.wrapping_add(t as u64);
                let mut order: Vec<usize> = (0..logical.len()).collect();
                order.shuffle(&mut StdRng::seed_from_u64(seed));
                route(logical, target, &Unbiased, order, params, seed, cancel)
            })
            .collect();

        for (t, r) in results.iter().enumerate() {
            debug!(
                trial = t,
                qubits = r.as_ref().map(|c| c.iter().map(Vec::len).sum::<usize>()),
                "dense trial finished"
            );
        }

        // min_by_key keeps the first of equally small trials
        let best = results
            .into_iter()
            .flatten()
            .min_by_key(|c| c.iter().map(Vec::len).sum::<usize>());
        match best {
            Some(slots) => Ok(Embedding::from_slots(&slots, target)),
            None if cancel.is_cancelled() => Err(EmbedError::Cancelled),
            None => Err(EmbedError::NoEmbedding { trials }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(n: usize) -> LogicalGraph {
        let mut g = LogicalGraph::new(n);
        for a in 0..n {
            for b in a + 1..n {
                g.add_edge(a, b);
            }
        }
        g
    }

    #[test]
    fn test_k4_on_one_cell() {
        let logical = complete(4);
        let target = TargetGraph::chimera(1, 1, 4);
        let e = DenseEmbedder::default()
            .embed(&logical, &target, &CancelToken::new())
            .unwrap();
        e.validate(&logical, &target).unwrap();
    }

    #[test]
    fn test_k5_on_chimera() {
        let logical = complete(5);
        let target = TargetGraph::chimera(2, 2, 4);
        let e = DenseEmbedder::default()
            .embed(&logical, &target, &CancelToken::new())
            .unwrap();
        e.validate(&logical, &target).unwrap();
        assert!(e.total_qubits() >= 5);
    }

    #[test]
    fn test_dense_is_deterministic() {
        let logical = complete(4);
        let target = TargetGraph::chimera(2, 2, 4);
        let emb = DenseEmbedder {
            seed: 9,
            ..Default::default()
        };
        let a = emb.embed(&logical, &target, &CancelToken::new()).unwrap();
        let b = emb.embed(&logical, &target, &CancelToken::new()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_impossible_reports_trials() {
        let logical = complete(3);
        let target = TargetGraph::from_edges([(0, 1), (1, 2)]);
        let emb = DenseEmbedder {
            trials: 3,
            max_rounds: 6,
            ..Default::default()
        };
        let err = emb.embed(&logical, &target, &CancelToken::new()).unwrap_err();
        assert_eq!(err, EmbedError::NoEmbedding { trials: 3 });
    }

    #[test]
    fn test_equal_trials_keep_the_first() {
        // every trial needs exactly two qubits for a single edge
        let logical = complete(2);
        let target = TargetGraph::chimera(2, 2, 4);
        let first_only = DenseEmbedder {
            trials: 1,
            seed: 21,
            ..Default::default()
        };
        let many = DenseEmbedder {
            trials: 8,
            ..first_only.clone()
        };
        let cancel = CancelToken::new();
        let a = first_only.embed(&logical, &target, &cancel).unwrap();
        let b = many.embed(&logical, &target, &cancel).unwrap();
        assert_eq!(a.total_qubits(), 2);
        assert_eq!(a, b);
    }

    #[test]
    fn test_cancelled_run_keeps_initial_placement() {
        let logical = complete(2);
        let target = TargetGraph::chimera(1, 1, 4);
        let cancel = CancelToken::new();
        cancel.cancel();
        let e = DenseEmbedder::default().embed(&logical, &target, &cancel).unwrap();
        e.validate(&logical, &target).unwrap();
    }

    #[test]
    fn test_cancelled_before_start() {
        let logical = complete(3);
        let target = TargetGraph::from_edges([(0, 1), (1, 2)]);
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = DenseEmbedder::default()
            .embed(&logical, &target, &cancel)
            .unwrap_err();
        assert_eq!(err, EmbedError::Cancelled);
    }
}
