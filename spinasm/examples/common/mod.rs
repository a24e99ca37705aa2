use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spinasm::backend::{BackendError, RawResults, SolveParams, Solver};
use spinasm::physical::PhysicalProblem;
use std::collections::BTreeMap;

/// Single-spin-flip simulated annealing, standing in for real hardware.
pub struct Annealer {
    pub seed: u64,
    pub sweeps: usize,
}

impl Solver for Annealer {
    fn solve(&self, problem: &PhysicalProblem, params: &SolveParams) -> Result<RawResults, BackendError> {
        let qubits: Vec<usize> = problem.qubits().into_iter().collect();
        let slot: BTreeMap<usize, usize> = qubits.iter().enumerate().map(|(k, &q)| (q, k)).collect();
        let mut field: Vec<Vec<(usize, f64)>> = vec![vec![]; qubits.len()];
        for (p, &j) in &problem.strengths {
            let (a, b) = (slot[&p.lo()], slot[&p.hi()]);
            field[a].push((b, j));
            field[b].push((a, j));
        }
        let h: Vec<f64> = qubits
            .iter()
            .map(|q| problem.weights.get(q).copied().unwrap_or(0.0))
            .collect();
        let width = qubits.last().map_or(0, |q| q + 1);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut found: BTreeMap<Vec<i8>, (f64, u64)> = BTreeMap::new();
        for _ in 0..params.sample_count {
            let mut s: Vec<f64> = (0..qubits.len())
                .map(|_| if rng.gen::<bool>() { 1.0 } else { -1.0 })
                .collect();
            for sweep in 0..self.sweeps {
                let beta = 0.1 + 10.0 * sweep as f64 / self.sweeps as f64;
                for k in 0..s.len() {
                    let local = h[k] + field[k].iter().map(|&(m, j)| j * s[m]).sum::<f64>();
                    let delta = -2.0 * s[k] * local;
                    if delta <= 0.0 || rng.gen::<f64>() < (-beta * delta).exp() {
                        s[k] = -s[k];
                    }
                }
            }
            let mut raw = vec![1i8; width];
            for (k, &q) in qubits.iter().enumerate() {
                raw[q] = s[k] as i8;
            }
            let energy: f64 = (0..s.len())
                .map(|k| h[k] * s[k] + field[k].iter().map(|&(m, j)| j * s[k] * s[m]).sum::<f64>() / 2.0)
                .sum();
            found.entry(raw).or_insert((energy, 0)).1 += 1;
        }

        let mut out = RawResults::default();
        for (raw, (energy, n)) in found {
            out.spin_vectors.push(raw);
            out.energies.push(energy);
            out.occurrence_counts.push(n);
        }
        Ok(out)
    }
}
