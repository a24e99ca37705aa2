//! Size statistics of a compiled problem.

use crate::logical::SimplifyReport;
use crate::physical::PhysicalProblem;
use crate::problem::Problem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompileStats {
    pub logical_vars: usize,
    pub logical_strengths: usize,
    pub logical_chains: usize,
    pub logical_pins: usize,
    pub physical_qubits: usize,
    pub physical_couplers: usize,
    pub physical_chain_couplers: usize,
    /// chain length -> number of chains
    pub chain_lengths: BTreeMap<usize, usize>,
    pub max_chain_len: usize,
    pub max_chain_count: usize,
    pub simplify: Option<SimplifyReport>,
    pub scale_factor: f64,
}

impl CompileStats {
    pub fn collect(
        logical: &Problem,
        logical_vars: usize,
        physical: &PhysicalProblem,
        simplify: Option<SimplifyReport>,
    ) -> Self {
        let chain_lengths = physical.embedding.chain_length_histogram();
        let (max_chain_len, max_chain_count) = chain_lengths
            .iter()
            .next_back()
            .map(|(&len, &n)| (len, n))
            .unwrap_or((0, 0));
        Self {
            logical_vars,
            logical_strengths: logical.strengths.values().filter(|j| **j != 0.0).count(),
            logical_chains: logical.chains.len(),
            logical_pins: logical.pinned.len(),
            physical_qubits: physical.embedding.total_qubits(),
            physical_couplers: physical.strengths.len(),
            physical_chain_couplers: physical.chains.len(),
            chain_lengths,
            max_chain_len,
            max_chain_count,
            simplify,
            scale_factor: physical.scale_factor,
        }
    }
}

impl fmt::Display for CompileStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "logical:  {} variables, {} strengths, {} chains, {} pins",
            self.logical_vars, self.logical_strengths, self.logical_chains, self.logical_pins
        )?;
        writeln!(
            f,
            "physical: {} qubits, {} couplers ({} in chains)",
            self.physical_qubits, self.physical_couplers, self.physical_chain_couplers
        )?;
        for (len, n) in &self.chain_lengths {
            writeln!(f, "  chains of length {len}: {n}")?;
        }
        if self.scale_factor != 1.0 {
            writeln!(f, "coefficients scaled by {}", self.scale_factor)?;
        }
        Ok(())
    }
}
