//! Overlap-penalized chain routing shared by the embedding strategies.
//!
//! Each logical variable is placed by running a shortest-path search outward
//! from every already-placed neighbor chain, picking the qubit with the lowest
//! summed distance as the new chain's root, and taking the union of the paths
//! back to each neighbor as the chain. Qubits already in use cost
//! `penalty^usage`, so repeated rip-up-and-reroute rounds push chains apart
//! until no qubit is shared.

use super::target::TargetGraph;
use super::{CancelToken, LogicalGraph};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};
use tracing::trace;

const FREE_COST: f64 = 1.0;
/// Overlap penalty for the first round; it grows by one every round until
/// the first valid placement is seen.
const INITIAL_PENALTY: f64 = 2.0;
const TIE_EPSILON: f64 = 1e-9;
/// Rounds without improvement tolerated once a valid placement exists.
pub(crate) const PATIENCE: usize = 4;

/// Restricts and biases where a chain may be rooted.
pub(crate) trait RootBias: Sync {
    /// Extra cost of rooting `var` at target slot `slot`, or `None` when the
    /// slot is out of bounds for this attempt.
    fn root_cost(&self, var: usize, slot: usize, attempt: usize) -> Option<f64>;

    /// Number of progressively wider attempts before placement gives up.
    fn max_attempts(&self) -> usize {
        1
    }
}

pub(crate) struct Unbiased;

impl RootBias for Unbiased {
    fn root_cost(&self, _var: usize, _slot: usize, _attempt: usize) -> Option<f64> {
        Some(0.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RouteParams {
    pub max_rounds: usize,
    pub patience: usize,
}

#[derive(Clone, Copy, PartialEq)]
struct Visit {
    cost: f64,
    slot: usize,
}

impl Eq for Visit {}

impl Ord for Visit {
    // reversed: BinaryHeap pops the cheapest visit first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.slot.cmp(&self.slot))
    }
}

impl PartialOrd for Visit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Router<'a, B: RootBias> {
    logical: &'a LogicalGraph,
    target: &'a TargetGraph,
    bias: &'a B,
    /// Sorted target slots per logical variable.
    chains: Vec<Vec<usize>>,
    usage: Vec<u32>,
    rng: StdRng,
}

impl<'a, B: RootBias> Router<'a, B> {
    fn new(logical: &'a LogicalGraph, target: &'a TargetGraph, bias: &'a B, seed: u64) -> Self {
        Self {
            logical,
            target,
            bias,
            chains: vec![Vec::new(); logical.len()],
            usage: vec![0; target.num_qubits()],
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn rip_up(&mut self, v: usize) {
        for s in std::mem::take(&mut self.chains[v]) {
            self.usage[s] -= 1;
        }
    }

    fn node_costs(&self, penalty: f64) -> Vec<f64> {
        self.usage
            .iter()
            .map(|&u| if u == 0 { FREE_COST } else { penalty.powi(u as i32) })
            .collect()
    }

    /// Multi-source Dijkstra; a path's cost is the sum of its non-source node costs.
    fn shortest_paths(&self, sources: &[usize], cost: &[f64]) -> (Vec<f64>, Vec<usize>) {
        let n = cost.len();
        let mut dist = vec![f64::INFINITY; n];
        let mut parent = vec![usize::MAX; n];
        let mut heap = BinaryHeap::new();
        for &s in sources {
            dist[s] = 0.0;
            heap.push(Visit { cost: 0.0, slot: s });
        }
        while let Some(Visit { cost: d, slot }) = heap.pop() {
            if d > dist[slot] {
                continue;
            }
            for &t in self.target.adj_slots(slot) {
                let nd = d + cost[t];
                if nd < dist[t] {
                    dist[t] = nd;
                    parent[t] = slot;
                    heap.push(Visit { cost: nd, slot: t });
                }
            }
        }
        (dist, parent)
    }

    /// Rip up and reroute `v`. Returns false when no root is reachable.
    fn place(&mut self, v: usize, penalty: f64) -> bool {
        self.rip_up(v);
        let cost = self.node_costs(penalty);
        let routes: Vec<(Vec<f64>, Vec<usize>)> = self
            .logical
            .neighbors(v)
            .filter(|&u| !self.chains[u].is_empty())
            .map(|u| self.shortest_paths(&self.chains[u], &cost))
            .collect();

        let totals: Vec<f64> = (0..cost.len())
            .map(|g| {
                routes.iter().fold(cost[g], |acc, (dist, _)| {
                    if dist[g] == 0.0 {
                        acc
                    } else {
                        acc + dist[g] - cost[g]
                    }
                })
            })
            .collect();

        for attempt in 0..self.bias.max_attempts() {
            let mut best = f64::INFINITY;
            let mut ties = Vec::new();
            for (g, &t) in totals.iter().enumerate() {
                if !t.is_finite() {
                    continue;
                }
                let Some(extra) = self.bias.root_cost(v, g, attempt) else {
                    continue;
                };
                let c = t + extra;
                if c < best - TIE_EPSILON {
                    best = c;
                    ties.clear();
                    ties.push(g);
                } else if (c - best).abs() <= TIE_EPSILON {
                    ties.push(g);
                }
            }
            let Some(&root) = ties.choose(&mut self.rng) else {
                continue;
            };
            let mut chain = BTreeSet::from([root]);
            for (dist, parent) in &routes {
                let mut x = root;
                while dist[x] > 0.0 {
                    chain.insert(x);
                    x = parent[x];
                }
            }
            for &s in &chain {
                self.usage[s] += 1;
            }
            self.chains[v] = chain.into_iter().collect();
            return true;
        }
        false
    }

    fn overlaps(&self) -> usize {
        self.usage.iter().filter(|&&u| u > 1).count()
    }

    fn total_qubits(&self) -> usize {
        self.chains.iter().map(Vec::len).sum()
    }

    fn touches(&self, a: usize, b: usize) -> bool {
        self.chains[a].iter().any(|&s| {
            self.target
                .adj_slots(s)
                .iter()
                .any(|t| self.chains[b].binary_search(t).is_ok())
        })
    }

    fn is_valid(&self) -> bool {
        self.chains.iter().all(|c| !c.is_empty())
            && self.overlaps() == 0
            && self.logical.edges().all(|(a, b)| self.touches(a, b))
    }

    fn consider(&self, best: &mut Option<(usize, Vec<Vec<usize>>)>) -> bool {
        if !self.is_valid() {
            return false;
        }
        let size = self.total_qubits();
        match best {
            Some((b, _)) if *b <= size => false,
            _ => {
                *best = Some((size, self.chains.clone()));
                true
            }
        }
    }
}

/// Place every logical variable, then reroute in rounds until the placement
/// is overlap free and stops shrinking. Returns chains as target slots, or
/// `None` when no valid placement was reached.
pub(crate) fn route<B: RootBias>(
    logical: &LogicalGraph,
    target: &TargetGraph,
    bias: &B,
    mut order: Vec<usize>,
    params: RouteParams,
    seed: u64,
    cancel: &CancelToken,
) -> Option<Vec<Vec<usize>>> {
    let mut r = Router::new(logical, target, bias, seed);
    for &v in &order {
        r.place(v, INITIAL_PENALTY);
    }

    // once valid, any overlap costs more than the longest overlap-free path
    let free_bound = target.num_qubits() as f64 + 1.0;
    let mut best = None;
    let mut stale = 0;
    for round in 0..params.max_rounds {
        if r.is_valid() {
            if r.consider(&mut best) {
                stale = 0;
            } else {
                stale += 1;
            }
            if stale >= params.patience {
                break;
            }
        }
        if cancel.is_cancelled() {
            break;
        }
        let penalty = if best.is_some() {
            free_bound
        } else {
            INITIAL_PENALTY + round as f64
        };
        order.shuffle(&mut r.rng);
        for &v in &order {
            r.place(v, penalty);
        }
        trace!(round, overlaps = r.overlaps(), "reroute round");
    }
    r.consider(&mut best);
    best.map(|(_, chains)| chains)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_graph(n: usize) -> TargetGraph {
        TargetGraph::from_edges((0..n - 1).map(|i| (i, i + 1)))
    }

    #[test]
    fn test_triangle_on_square_needs_a_chain() {
        let mut g = LogicalGraph::new(3);
        g.add_edge(0, 1);
        g.add_edge(1, 2);
        g.add_edge(0, 2);
        // 4-cycle: a triangle fits only if one variable uses two qubits
        let target = TargetGraph::from_edges([(0, 1), (1, 2), (2, 3), (3, 0)]);
        let params = RouteParams {
            max_rounds: 32,
            patience: PATIENCE,
        };
        let chains = route(&g, &target, &Unbiased, vec![0, 1, 2], params, 7, &CancelToken::new())
            .expect("triangle embeds in a 4-cycle");
        assert_eq!(chains.iter().map(Vec::len).sum::<usize>(), 4);
    }

    #[test]
    fn test_unreachable_target_fails() {
        let mut g = LogicalGraph::new(3);
        g.add_edge(0, 1);
        g.add_edge(1, 2);
        g.add_edge(0, 2);
        let params = RouteParams {
            max_rounds: 8,
            patience: PATIENCE,
        };
        assert!(route(&g, &path_graph(2), &Unbiased, vec![0, 1, 2], params, 1, &CancelToken::new()).is_none());
    }

    #[test]
    fn test_same_seed_same_chains() {
        let mut g = LogicalGraph::new(4);
        for (a, b) in [(0, 1), (1, 2), (2, 3), (3, 0), (0, 2)] {
            g.add_edge(a, b);
        }
        let target = TargetGraph::chimera(2, 2, 4);
        let params = RouteParams {
            max_rounds: 16,
            patience: PATIENCE,
        };
        let a = route(&g, &target, &Unbiased, vec![0, 1, 2, 3], params, 42, &CancelToken::new());
        let b = route(&g, &target, &Unbiased, vec![0, 1, 2, 3], params, 42, &CancelToken::new());
        assert!(a.is_some());
        assert_eq!(a, b);
    }
}
