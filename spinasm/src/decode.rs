//! Turning raw solver samples back into named, checked solutions.

use crate::assertion::AssertOutcome;
use crate::backend::{BackendError, RawResults};
use crate::embed::Embedding;
use crate::problem::Problem;
use crate::symbols::{is_internal_name, SymbolTable};
use crate::{Mode, Spin};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Energies closer than this are considered equal.
pub const MIN_ENERGY_DELTA: f64 = 0.005;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Report every distinct solution, broken or failing ones included.
    pub all_solutions: bool,
    /// Report only valid solutions within `energy_tolerance` of the best one.
    pub lowest_only: bool,
    pub energy_tolerance: f64,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            all_solutions: false,
            lowest_only: true,
            energy_tolerance: MIN_ENERGY_DELTA,
        }
    }
}

/// Unsigned big integer read MSB first from a solution's user-visible bits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SolutionId {
    /// Little-endian 64-bit limbs without trailing zeros.
    limbs: Vec<u64>,
}

impl SolutionId {
    pub fn from_bits(bits: impl IntoIterator<Item = bool>) -> Self {
        let mut limbs: Vec<u64> = Vec::new();
        for b in bits {
            let mut carry = b as u64;
            for l in limbs.iter_mut() {
                let next = *l >> 63;
                *l = (*l << 1) | carry;
                carry = next;
            }
            if carry != 0 {
                limbs.push(carry);
            }
        }
        Self { limbs }
    }

    pub fn is_zero(&self) -> bool {
        self.limbs.is_empty()
    }
}

impl fmt::Display for SolutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const CHUNK: u128 = 10_000_000_000_000_000_000;
        if self.limbs.is_empty() {
            return write!(f, "0");
        }
        let mut limbs = self.limbs.clone();
        let mut chunks = Vec::new();
        while !limbs.is_empty() {
            let mut rem: u128 = 0;
            for l in limbs.iter_mut().rev() {
                let cur = (rem << 64) | *l as u128;
                *l = (cur / CHUNK) as u64;
                rem = cur % CHUNK;
            }
            chunks.push(rem as u64);
            while limbs.last() == Some(&0) {
                limbs.pop();
            }
        }
        let mut iter = chunks.iter().rev();
        if let Some(first) = iter.next() {
            write!(f, "{first}")?;
        }
        for c in iter {
            write!(f, "{c:019}")?;
        }
        Ok(())
    }
}

/// One decoded sample, or several identical ones after deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub id: SolutionId,
    /// Backend energy plus the problem offset.
    pub energy: f64,
    pub occurrences: u64,
    /// User-visible names; `None` marks a broken chain.
    pub values: BTreeMap<String, Option<Spin>>,
    pub broken_chains: Vec<String>,
    pub broken_pins: Vec<String>,
    pub assertions: Vec<AssertOutcome>,
}

impl Solution {
    pub fn is_broken(&self) -> bool {
        !self.broken_chains.is_empty() || !self.broken_pins.is_empty()
    }

    pub fn passes_assertions(&self) -> bool {
        self.assertions.iter().all(|a| a.passed)
    }

    pub fn is_valid(&self) -> bool {
        !self.is_broken() && self.passes_assertions()
    }

    pub fn value(&self, name: &str) -> Option<Spin> {
        self.values.get(name).copied().flatten()
    }

    /// `name = value` lines, bits for QUBO and spins for Ising.
    pub fn render(&self, mode: Mode) -> String {
        let mut out = String::new();
        for (name, v) in &self.values {
            let shown = match (v, mode) {
                (None, _) => "?".to_string(),
                (Some(s), Mode::Qubo) => (s.as_bit() as u8).to_string(),
                (Some(s), Mode::Ising) => s.as_raw().to_string(),
            };
            out.push_str(&format!("{name} = {shown}\n"));
        }
        out
    }
}

/// Sample counts, weighted by occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeStats {
    pub total: u64,
    /// Dropped by the backend for broken chains.
    pub discarded: u64,
    pub not_broken: u64,
    pub at_min_energy: u64,
    pub assertion_failures: u64,
    pub distinct: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeReport {
    pub mode: Mode,
    /// Ranked by energy, lowest first.
    pub solutions: Vec<Solution>,
    pub stats: DecodeStats,
}

impl DecodeReport {
    pub fn best(&self) -> Option<&Solution> {
        self.solutions.first()
    }
}

pub struct Decoder<'a> {
    pub problem: &'a Problem,
    pub symbols: &'a SymbolTable,
    pub embedding: &'a Embedding,
    /// Mode the program was written in.
    pub mode: Mode,
}

impl Decoder<'_> {
    fn sample(&self, spins: &[i8], energy: f64, occurrences: u64) -> Result<Solution, BackendError> {
        let mut logical: Vec<Option<Spin>> = Vec::with_capacity(self.symbols.len());
        let mut broken_chains = Vec::new();
        for i in 0..self.symbols.len() {
            let mut values = self.embedding.chain(i).iter().map(|&q| {
                spins
                    .get(q)
                    .copied()
                    .and_then(Spin::from_raw)
                    .ok_or_else(|| BackendError::Malformed(format!("no spin for qubit {q}")))
            });
            let first = values.next().transpose()?;
            let mut agree = true;
            for v in values {
                agree &= Some(v?) == first;
            }
            if !agree {
                broken_chains.push(self.display_name(i));
            }
            logical.push(if agree { first } else { None });
        }

        let mut broken_pins: Vec<String> = self
            .problem
            .pinned
            .iter()
            .filter(|(i, pin)| matches!(logical.get(**i), Some(Some(s)) if s != *pin))
            .map(|(&i, _)| self.display_name(self.problem.pin_helpers.get(&i).copied().unwrap_or(i)))
            .collect();
        broken_pins.sort();
        broken_pins.dedup();

        let mut values: BTreeMap<String, Option<Spin>> = self
            .symbols
            .iter()
            .filter(|(n, _)| !is_internal_name(n))
            .map(|(n, i)| (n.to_string(), logical.get(i).copied().flatten()))
            .collect();
        for (name, &s) in &self.problem.known_values {
            if !is_internal_name(name) {
                values.insert(name.clone(), Some(s));
            }
        }

        let env: BTreeMap<String, Option<bool>> = values
            .iter()
            .map(|(n, v)| (n.clone(), v.map(Spin::as_bit)))
            .collect();
        let assertions = self.problem.assertions.iter().map(|e| e.check(&env)).collect();

        let id_bits = (0..self.symbols.len())
            .filter(|&i| !self.symbols.is_internal(i))
            .map(|i| logical[i].is_some_and(Spin::as_bit))
            .chain(
                self.problem
                    .known_values
                    .iter()
                    .filter(|(n, _)| !is_internal_name(n))
                    .map(|(_, s)| s.as_bit()),
            );

        Ok(Solution {
            id: SolutionId::from_bits(id_bits),
            energy: energy + self.problem.simple_offset,
            occurrences,
            values,
            broken_chains,
            broken_pins,
            assertions,
        })
    }

    fn display_name(&self, i: usize) -> String {
        self.symbols
            .name_of(i)
            .map(str::to_string)
            .unwrap_or_else(|_| format!("#{i}"))
    }

    /// Decode, filter, rank and deduplicate raw samples.
    pub fn decode(&self, raw: &RawResults, opts: &DecodeOptions) -> Result<DecodeReport, BackendError> {
        raw.check()?;
        let mut samples = Vec::with_capacity(raw.spin_vectors.len());
        for ((spins, &e), &n) in raw.spin_vectors.iter().zip(&raw.energies).zip(&raw.occurrence_counts) {
            samples.push(self.sample(spins, e, n)?);
        }
        samples.sort_by(|a, b| a.energy.total_cmp(&b.energy));

        let mut stats = DecodeStats {
            total: samples.iter().map(|s| s.occurrences).sum(),
            discarded: raw.broken_count,
            ..DecodeStats::default()
        };
        let intact: Vec<&Solution> = samples.iter().filter(|s| !s.is_broken()).collect();
        stats.not_broken = intact.iter().map(|s| s.occurrences).sum();
        stats.assertion_failures = intact
            .iter()
            .filter(|s| !s.passes_assertions())
            .map(|s| s.occurrences)
            .sum();
        if let Some(min) = intact.first().map(|s| s.energy) {
            stats.at_min_energy = intact
                .iter()
                .filter(|s| s.energy - min <= opts.energy_tolerance)
                .map(|s| s.occurrences)
                .sum();
        }

        let mut kept: Vec<Solution> = if opts.all_solutions {
            samples
        } else {
            samples.into_iter().filter(Solution::is_valid).collect()
        };
        if opts.lowest_only && !opts.all_solutions {
            if let Some(min) = kept.first().map(|s| s.energy) {
                kept.retain(|s| s.energy - min <= opts.energy_tolerance);
            }
        }

        // broken chains read as 0 in the id, so broken samples only merge
        // with samples broken the same way
        let mut solutions: Vec<Solution> = Vec::new();
        let mut seen: BTreeMap<(SolutionId, Vec<String>, Vec<String>), usize> = BTreeMap::new();
        for s in kept {
            let key = (s.id.clone(), s.broken_chains.clone(), s.broken_pins.clone());
            match seen.get(&key) {
                Some(&k) => solutions[k].occurrences += s.occurrences,
                None => {
                    seen.insert(key, solutions.len());
                    solutions.push(s);
                }
            }
        }
        stats.distinct = solutions.len();
        debug!(?stats, "samples decoded");
        Ok(DecodeReport {
            mode: self.mode,
            solutions,
            stats,
        })
    }
}

impl PartialOrd for SolutionId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SolutionId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.limbs
            .len()
            .cmp(&other.limbs.len())
            .then_with(|| self.limbs.iter().rev().cmp(other.limbs.iter().rev()))
    }
}
