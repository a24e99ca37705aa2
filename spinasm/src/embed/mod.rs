//! Minor embedding of a logical interaction graph into a hardware graph.

pub mod dense;
mod error;
pub mod layout;
mod route;
pub mod target;

pub use dense::DenseEmbedder;
pub use error::EmbedError;
pub use layout::LayoutEmbedder;
pub use target::{ChimeraShape, TargetGraph};

use crate::problem::Problem;
use crate::symbols::SymbolTable;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag checked between routing rounds.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Interaction graph over dense logical indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogicalGraph {
    adj: Vec<BTreeSet<usize>>,
}

impl LogicalGraph {
    pub fn new(len: usize) -> Self {
        Self {
            adj: vec![BTreeSet::new(); len],
        }
    }

    /// Edges are every nonzero strength plus every surviving chain.
    pub fn from_problem(problem: &Problem, len: usize) -> Self {
        let mut g = Self::new(len);
        for (p, _) in problem.strengths.iter().filter(|(_, j)| **j != 0.0) {
            g.add_edge(p.lo(), p.hi());
        }
        for p in &problem.chains {
            g.add_edge(p.lo(), p.hi());
        }
        g
    }

    pub fn add_edge(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let need = a.max(b) + 1;
        if self.adj.len() < need {
            self.adj.resize(need, BTreeSet::new());
        }
        self.adj[a].insert(b);
        self.adj[b].insert(a);
    }

    pub fn len(&self) -> usize {
        self.adj.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adj.is_empty()
    }

    pub fn neighbors(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.adj.get(v).into_iter().flatten().copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.adj
            .iter()
            .enumerate()
            .flat_map(|(a, set)| set.range(a + 1..).map(move |&b| (a, b)))
    }
}

/// Chain of physical qubits per logical index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embedding {
    chains: Vec<Vec<usize>>,
}

impl Embedding {
    /// Chains are stored sorted by qubit id.
    pub fn new(mut chains: Vec<Vec<usize>>) -> Self {
        for c in chains.iter_mut() {
            c.sort_unstable();
            c.dedup();
        }
        Self { chains }
    }

    pub(crate) fn from_slots(slots: &[Vec<usize>], target: &TargetGraph) -> Self {
        Self::new(
            slots
                .iter()
                .map(|c| c.iter().map(|&s| target.id(s)).collect())
                .collect(),
        )
    }

    pub fn chain(&self, v: usize) -> &[usize] {
        self.chains.get(v).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn chains(&self) -> &[Vec<usize>] {
        &self.chains
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn total_qubits(&self) -> usize {
        self.chains.iter().map(Vec::len).sum()
    }

    pub fn max_chain_len(&self) -> usize {
        self.chains.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Number of chains of each length.
    pub fn chain_length_histogram(&self) -> BTreeMap<usize, usize> {
        let mut h = BTreeMap::new();
        for c in &self.chains {
            *h.entry(c.len()).or_insert(0) += 1;
        }
        h
    }

    /// Check chains are non-empty, disjoint, connected, on the target, and
    /// that every logical edge is realized by some physical edge.
    pub fn validate(&self, logical: &LogicalGraph, target: &TargetGraph) -> Result<(), EmbedError> {
        if self.chains.len() != logical.len() {
            return Err(EmbedError::Invalid(format!(
                "{} chains for {} variables",
                self.chains.len(),
                logical.len()
            )));
        }
        let mut owner: BTreeMap<usize, usize> = BTreeMap::new();
        for (v, chain) in self.chains.iter().enumerate() {
            if chain.is_empty() {
                return Err(EmbedError::Invalid(format!("variable {v} has an empty chain")));
            }
            for &q in chain {
                if !target.contains(q) {
                    return Err(EmbedError::Invalid(format!("qubit {q} is not in the target")));
                }
                if let Some(u) = owner.insert(q, v) {
                    return Err(EmbedError::Invalid(format!("qubit {q} is shared by {u} and {v}")));
                }
            }
            if !is_connected(chain, target) {
                return Err(EmbedError::Invalid(format!("chain of variable {v} is disconnected")));
            }
        }
        for (a, b) in logical.edges() {
            let realized = self.chains[a]
                .iter()
                .any(|&q| target.neighbors(q).any(|r| owner.get(&r) == Some(&b)));
            if !realized {
                return Err(EmbedError::Invalid(format!("edge ({a}, {b}) has no coupler")));
            }
        }
        Ok(())
    }
}

fn is_connected(chain: &[usize], target: &TargetGraph) -> bool {
    let Some(&first) = chain.first() else {
        return true;
    };
    let mut seen = BTreeSet::from([first]);
    let mut stack = vec![first];
    while let Some(q) = stack.pop() {
        for r in target.neighbors(q) {
            if chain.binary_search(&r).is_ok() && seen.insert(r) {
                stack.push(r);
            }
        }
    }
    seen.len() == chain.len()
}

/// A strategy for finding an embedding.
pub trait Embedder: Send + Sync {
    fn name(&self) -> &'static str;

    fn embed(
        &self,
        logical: &LogicalGraph,
        target: &TargetGraph,
        cancel: &CancelToken,
    ) -> Result<Embedding, EmbedError>;
}

/// Embedding strategy selection, as found in compile options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum EmbedOptions {
    Dense {
        #[serde(default = "default_trials")]
        trials: usize,
        #[serde(default)]
        seed: u64,
        #[serde(default = "default_max_rounds")]
        max_rounds: usize,
    },
    Layout {
        /// `(x, y)` keyed by variable name.
        locations: BTreeMap<String, (f64, f64)>,
        #[serde(default)]
        seed: u64,
        #[serde(default = "default_max_rounds")]
        max_rounds: usize,
        #[serde(default = "default_radius")]
        radius: usize,
    },
}

fn default_trials() -> usize {
    dense::DENSE_TRIALS
}

fn default_max_rounds() -> usize {
    dense::DEFAULT_MAX_ROUNDS
}

fn default_radius() -> usize {
    layout::DEFAULT_RADIUS
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self::Dense {
            trials: dense::DENSE_TRIALS,
            seed: 0,
            max_rounds: dense::DEFAULT_MAX_ROUNDS,
        }
    }
}

impl EmbedOptions {
    /// Build the selected embedder; layout names are resolved through `symbols`
    /// and names that no longer exist are skipped.
    pub fn embedder(&self, symbols: &SymbolTable) -> Box<dyn Embedder> {
        match self {
            Self::Dense {
                trials,
                seed,
                max_rounds,
            } => Box::new(DenseEmbedder {
                trials: *trials,
                seed: *seed,
                max_rounds: *max_rounds,
            }),
            Self::Layout {
                locations,
                seed,
                max_rounds,
                radius,
            } => Box::new(LayoutEmbedder {
                locations: locations
                    .iter()
                    .filter_map(|(name, &xy)| symbols.lookup(name).map(|i| (i, xy)))
                    .collect(),
                seed: *seed,
                max_rounds: *max_rounds,
                radius: *radius,
            }),
        }
    }
}

/// Run `embedder` after the cheap feasibility checks, and validate its result.
pub fn embed(
    embedder: &dyn Embedder,
    logical: &LogicalGraph,
    target: &TargetGraph,
    cancel: &CancelToken,
) -> Result<Embedding, EmbedError> {
    if logical.is_empty() {
        return Ok(Embedding::default());
    }
    if target.num_qubits() == 0 {
        return Err(EmbedError::EmptyTarget);
    }
    if logical.len() > target.num_qubits() {
        return Err(EmbedError::TooLarge {
            vars: logical.len(),
            qubits: target.num_qubits(),
        });
    }
    let embedding = embedder.embed(logical, target, cancel)?;
    embedding.validate(logical, target)?;
    tracing::info!(
        strategy = embedder.name(),
        vars = embedding.len(),
        qubits = embedding.total_qubits(),
        max_chain = embedding.max_chain_len(),
        "embedding found"
    );
    Ok(embedding)
}
