//! Hardware connectivity graphs.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Dimensions of a Chimera graph: a `rows x cols` grid of `K(shore, shore)` cells.
///
/// Qubit `k` on side `side` (0 = vertical, 1 = horizontal) of cell `(row, col)`
/// has id `((row * cols + col) * 2 + side) * shore + k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChimeraShape {
    pub rows: usize,
    pub cols: usize,
    pub shore: usize,
}

impl ChimeraShape {
    pub fn new(rows: usize, cols: usize, shore: usize) -> Self {
        Self { rows, cols, shore }
    }

    pub fn num_qubits(&self) -> usize {
        self.rows * self.cols * 2 * self.shore
    }

    /// A shape with a zero dimension has no cells to number qubits by.
    pub fn is_empty(&self) -> bool {
        self.num_qubits() == 0
    }

    pub fn linear(&self, row: usize, col: usize, side: usize, k: usize) -> usize {
        ((row * self.cols + col) * 2 + side) * self.shore + k
    }

    /// Inverse of [`ChimeraShape::linear`]: `(row, col, side, k)`.
    pub fn coords(&self, q: usize) -> (usize, usize, usize, usize) {
        let k = q % self.shore;
        let side = (q / self.shore) % 2;
        let cell = q / (2 * self.shore);
        (cell / self.cols, cell % self.cols, side, k)
    }

    pub fn cell_of(&self, q: usize) -> (usize, usize) {
        let (r, c, _, _) = self.coords(q);
        (r, c)
    }

    /// Whether `(a, b)` is a coupler of the complete Chimera graph of this shape.
    pub fn is_edge(&self, a: usize, b: usize) -> bool {
        if a >= self.num_qubits() || b >= self.num_qubits() || a == b {
            return false;
        }
        let (ra, ca, sa, ka) = self.coords(a);
        let (rb, cb, sb, kb) = self.coords(b);
        if (ra, ca) == (rb, cb) {
            return sa != sb;
        }
        if sa != sb || ka != kb {
            return false;
        }
        match sa {
            0 => ca == cb && ra.abs_diff(rb) == 1,
            _ => ra == rb && ca.abs_diff(cb) == 1,
        }
    }
}

/// Undirected graph over physical qubit ids.
#[derive(Debug, Clone, Default)]
pub struct TargetGraph {
    qubits: Vec<usize>,
    slot: HashMap<usize, usize>,
    adj: Vec<Vec<usize>>,
    shape: Option<ChimeraShape>,
}

impl TargetGraph {
    /// Build from an edge list; self loops are ignored and duplicates merged.
    pub fn from_edges(edges: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let edges: BTreeSet<(usize, usize)> = edges
            .into_iter()
            .filter(|(a, b)| a != b)
            .map(|(a, b)| (a.min(b), a.max(b)))
            .collect();
        let qubits: Vec<usize> = edges
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let slot: HashMap<usize, usize> = qubits.iter().enumerate().map(|(s, &q)| (q, s)).collect();
        let mut adj = vec![Vec::new(); qubits.len()];
        for (a, b) in edges {
            let (sa, sb) = (slot[&a], slot[&b]);
            adj[sa].push(sb);
            adj[sb].push(sa);
        }
        for list in adj.iter_mut() {
            list.sort_unstable();
        }
        Self {
            qubits,
            slot,
            adj,
            shape: None,
        }
    }

    /// Complete Chimera graph with the given dimensions.
    pub fn chimera(rows: usize, cols: usize, shore: usize) -> Self {
        let shape = ChimeraShape::new(rows, cols, shore);
        let mut edges = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                for k in 0..shore {
                    for k2 in 0..shore {
                        edges.push((shape.linear(r, c, 0, k), shape.linear(r, c, 1, k2)));
                    }
                    if r + 1 < rows {
                        edges.push((shape.linear(r, c, 0, k), shape.linear(r + 1, c, 0, k)));
                    }
                    if c + 1 < cols {
                        edges.push((shape.linear(r, c, 1, k), shape.linear(r, c + 1, 1, k)));
                    }
                }
            }
        }
        Self::from_edges(edges).with_shape(shape)
    }

    pub fn with_shape(mut self, shape: ChimeraShape) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Copy of the graph with the given (e.g. broken) qubits removed.
    pub fn without_qubits(&self, removed: &[usize]) -> Self {
        let removed: BTreeSet<usize> = removed.iter().copied().collect();
        let g = Self::from_edges(
            self.edges()
                .filter(|(a, b)| !removed.contains(a) && !removed.contains(b)),
        );
        match self.shape {
            Some(s) => g.with_shape(s),
            None => g,
        }
    }

    /// Detect a square Chimera layout with the given shore size.
    pub fn infer_chimera(&self, shore: usize) -> Option<ChimeraShape> {
        let max = *self.qubits.last()?;
        if shore == 0 {
            return None;
        }
        let cells = (max + 1).div_ceil(2 * shore);
        let mut side = (cells as f64).sqrt() as usize;
        while side * side < cells {
            side += 1;
        }
        let shape = ChimeraShape::new(side, side, shore);
        self.edges()
            .all(|(a, b)| shape.is_edge(a, b))
            .then_some(shape)
    }

    /// Known Chimera shape; empty shapes are treated as unknown.
    pub fn shape(&self) -> Option<ChimeraShape> {
        self.shape.filter(|s| !s.is_empty())
    }

    pub fn num_qubits(&self) -> usize {
        self.qubits.len()
    }

    pub fn num_edges(&self) -> usize {
        self.adj.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn qubits(&self) -> &[usize] {
        &self.qubits
    }

    pub fn contains(&self, q: usize) -> bool {
        self.slot.contains_key(&q)
    }

    pub fn has_edge(&self, a: usize, b: usize) -> bool {
        match (self.slot.get(&a), self.slot.get(&b)) {
            (Some(&sa), Some(&sb)) => self.adj[sa].binary_search(&sb).is_ok(),
            _ => false,
        }
    }

    pub fn neighbors(&self, q: usize) -> impl Iterator<Item = usize> + '_ {
        self.slot
            .get(&q)
            .into_iter()
            .flat_map(move |&s| self.adj[s].iter().map(move |&t| self.qubits[t]))
    }

    /// Every edge once, as `(low, high)`.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.adj.iter().enumerate().flat_map(move |(s, list)| {
            list.iter()
                .filter(move |&&t| t > s)
                .map(move |&t| (self.qubits[s], self.qubits[t]))
        })
    }

    /// Chimera cell of a qubit, when the shape is known.
    pub fn cell_of(&self, q: usize) -> Option<(usize, usize)> {
        self.shape().map(|s| s.cell_of(q))
    }

    pub(crate) fn id(&self, slot: usize) -> usize {
        self.qubits[slot]
    }

    pub(crate) fn adj_slots(&self, slot: usize) -> &[usize] {
        &self.adj[slot]
    }
}
