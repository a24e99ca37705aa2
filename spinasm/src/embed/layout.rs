//! Layout-aware embedding: chains are rooted near a per-variable location
//! hint, mapped onto the Chimera cell grid.

use super::route::{route, RootBias, RouteParams, PATIENCE};
use super::target::ChimeraShape;
use super::{CancelToken, EmbedError, Embedder, Embedding, LogicalGraph, TargetGraph};
use std::collections::BTreeMap;
use tracing::debug;

pub const DEFAULT_RADIUS: usize = 1;
/// Root cost added per cell of distance from the hint.
const HINT_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct LayoutEmbedder {
    /// `(x, y)` per logical index; variables without one sit at the centroid
    /// of their located neighbors.
    pub locations: BTreeMap<usize, (f64, f64)>,
    pub seed: u64,
    pub max_rounds: usize,
    /// Cell distance a root may stray from its hint before the search widens.
    pub radius: usize,
}

struct CellBias<'a> {
    target: &'a TargetGraph,
    shape: ChimeraShape,
    hints: Vec<(usize, usize)>,
    radius: usize,
}

impl RootBias for CellBias<'_> {
    fn root_cost(&self, var: usize, slot: usize, attempt: usize) -> Option<f64> {
        let (r, c) = self.shape.cell_of(self.target.id(slot));
        let (hr, hc) = self.hints[var];
        let d = r.abs_diff(hr) + c.abs_diff(hc);
        let reach = self.radius + attempt * self.radius.max(1);
        (d <= reach).then(|| d as f64 * HINT_WEIGHT)
    }

    fn max_attempts(&self) -> usize {
        (self.shape.rows + self.shape.cols) / self.radius.max(1) + 2
    }
}

impl LayoutEmbedder {
    /// Cell hint per logical variable.
    fn hints(
        &self,
        logical: &LogicalGraph,
        shape: ChimeraShape,
    ) -> Result<Vec<(usize, usize)>, EmbedError> {
        let n = logical.len();
        let known: Vec<(f64, f64)> = (0..n).filter_map(|v| self.locations.get(&v).copied()).collect();
        if known.is_empty() {
            return Err(EmbedError::MissingLocations);
        }
        let centroid = |pts: &[(f64, f64)]| {
            let k = pts.len() as f64;
            let (sx, sy) = pts.iter().fold((0.0_f64, 0.0_f64), |(ax, ay), &(x, y)| (ax + x, ay + y));
            (sx / k, sy / k)
        };
        let everywhere = centroid(&known);
        let points: Vec<(f64, f64)> = (0..n)
            .map(|v| {
                self.locations.get(&v).copied().unwrap_or_else(|| {
                    let near: Vec<(f64, f64)> = logical
                        .neighbors(v)
                        .filter_map(|u| self.locations.get(&u).copied())
                        .collect();
                    if near.is_empty() {
                        everywhere
                    } else {
                        centroid(&near)
                    }
                })
            })
            .collect();

        let (min_x, max_x) = bounds(points.iter().map(|p| p.0));
        let (min_y, max_y) = bounds(points.iter().map(|p| p.1));
        let mut scale = f64::INFINITY;
        if max_x > min_x {
            scale = scale.min(shape.cols.saturating_sub(1) as f64 / (max_x - min_x));
        }
        if max_y > min_y {
            scale = scale.min(shape.rows.saturating_sub(1) as f64 / (max_y - min_y));
        }
        if !scale.is_finite() {
            scale = 0.0;
        }
        let cell = |v: f64, lo: f64, cap: usize| (((v - lo) * scale).round() as usize).min(cap.saturating_sub(1));
        Ok(points
            .iter()
            .map(|&(x, y)| (cell(y, min_y, shape.rows), cell(x, min_x, shape.cols)))
            .collect())
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

impl Embedder for LayoutEmbedder {
    fn name(&self) -> &'static str {
        "layout"
    }

    fn embed(
        &self,
        logical: &LogicalGraph,
        target: &TargetGraph,
        cancel: &CancelToken,
    ) -> Result<Embedding, EmbedError> {
        let shape = target.shape().ok_or(EmbedError::NotChimera)?;
        let hints = self.hints(logical, shape)?;
        let mut order: Vec<usize> = (0..logical.len()).collect();
        order.sort_by_key(|&v| (hints[v], v));
        debug!(vars = order.len(), radius = self.radius, "layout hints computed");

        let bias = CellBias {
            target,
            shape,
            hints,
            radius: self.radius,
        };
        let params = RouteParams {
            max_rounds: self.max_rounds,
            patience: PATIENCE,
        };
        match route(logical, target, &bias, order, params, self.seed, cancel) {
            Some(slots) => Ok(Embedding::from_slots(&slots, target)),
            None if cancel.is_cancelled() => Err(EmbedError::Cancelled),
            None => Err(EmbedError::NoEmbedding { trials: 1 }),
        }
    }
}
