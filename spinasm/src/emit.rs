//! Re-emitting problems as programs and as bqpjson documents.

use crate::physical::PhysicalProblem;
use crate::problem::Problem;
use crate::symbols::{SymbolError, SymbolTable};
use crate::{Mode, Stmt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const BQPJSON_VERSION: &str = "1.0.0";

/// The problem as a program in `mode`. Terms of pin helpers are left out in
/// favor of the pins they enforce, extra names of an index become chains and
/// values fixed during simplification become pins.
pub fn statements(problem: &Problem, symbols: &SymbolTable, mode: Mode) -> Result<Vec<Stmt>, SymbolError> {
    let is_helper = |i: usize| problem.pin_helpers.contains_key(&i);
    // helper terms go before converting, or QUBO form folds them into user weights
    let mut user = problem.clone();
    user.weights.retain(|&i, _| !is_helper(i));
    user.strengths.retain(|p, _| !is_helper(p.lo()) && !is_helper(p.hi()));
    user.chains.retain(|p| !is_helper(p.lo()) && !is_helper(p.hi()));
    user.pinned.retain(|&i, _| !is_helper(i));
    let converted = match mode {
        Mode::Qubo => user.to_qubo(),
        Mode::Ising => user.to_ising(),
    };
    let name = |i: usize| symbols.name_of(i).map(str::to_string);
    let mut out = Vec::new();

    for (&i, &w) in &converted.weights {
        if w != 0.0 {
            out.push(Stmt::weight(name(i)?, w));
        }
    }
    for (p, &j) in &converted.strengths {
        if j != 0.0 {
            out.push(Stmt::strength(name(p.lo())?, name(p.hi())?, j));
        }
    }
    for p in &converted.chains {
        out.push(Stmt::chain(name(p.lo())?, name(p.hi())?));
    }
    for i in 0..symbols.len() {
        if is_helper(i) {
            continue;
        }
        let primary = symbols.name_of(i)?;
        for other in symbols.names_of(i).into_iter().filter(|n| *n != primary) {
            out.push(Stmt::chain(primary, other));
        }
    }
    for (&i, &s) in &converted.pinned {
        out.push(Stmt::pin(name(i)?, s.as_bit()));
    }
    for (n, &s) in &converted.known_values {
        if !crate::symbols::is_internal_name(n) {
            out.push(Stmt::pin(n.clone(), s.as_bit()));
        }
    }
    out.extend(converted.assertions.iter().cloned().map(Stmt::Assert));
    Ok(out)
}

/// [`statements`] rendered one per line.
pub fn program_text(problem: &Problem, symbols: &SymbolTable, mode: Mode) -> Result<String, SymbolError> {
    let mut text = String::new();
    for st in statements(problem, symbols, mode)? {
        text.push_str(&st.to_string());
        text.push('\n');
    }
    Ok(text)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearTerm {
    pub id: usize,
    pub coeff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadraticTerm {
    pub id_tail: usize,
    pub id_head: usize,
    pub coeff: f64,
}

/// A bqpjson document: energy is `scale * (offset + linear + quadratic)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BqpJson {
    pub version: String,
    pub id: u64,
    pub metadata: BTreeMap<String, Value>,
    pub variable_ids: Vec<usize>,
    pub variable_domain: String,
    pub scale: f64,
    pub offset: f64,
    pub linear_terms: Vec<LinearTerm>,
    pub quadratic_terms: Vec<QuadraticTerm>,
}

fn domain(mode: Mode) -> String {
    match mode {
        Mode::Qubo => "boolean",
        Mode::Ising => "spin",
    }
    .to_string()
}

impl BqpJson {
    /// Logical problem over dense indices; names are kept in the metadata.
    pub fn from_logical(problem: &Problem, symbols: &SymbolTable) -> Self {
        let names: BTreeMap<String, Value> = symbols
            .iter()
            .map(|(n, i)| (n.to_string(), json!(i)))
            .collect();
        let metadata = BTreeMap::from([
            ("generated_by".to_string(), json!("spinasm")),
            ("variable_names".to_string(), Value::Object(names.into_iter().collect())),
        ]);
        Self {
            version: BQPJSON_VERSION.to_string(),
            id: 0,
            metadata,
            variable_ids: (0..symbols.len()).collect(),
            variable_domain: domain(problem.mode),
            scale: 1.0,
            offset: problem.simple_offset,
            linear_terms: problem
                .weights
                .iter()
                .filter(|(_, w)| **w != 0.0)
                .map(|(&id, &coeff)| LinearTerm { id, coeff })
                .collect(),
            quadratic_terms: problem
                .strengths
                .iter()
                .filter(|(_, j)| **j != 0.0)
                .map(|(p, &coeff)| QuadraticTerm {
                    id_tail: p.lo(),
                    id_head: p.hi(),
                    coeff,
                })
                .collect(),
        }
    }

    /// Physical problem over qubit ids. The scale undoes coefficient scaling,
    /// so the document's energy is the unscaled energy plus the offset.
    pub fn from_physical(problem: &PhysicalProblem) -> Self {
        let factor = problem.scale_factor;
        let chains: Vec<Value> = problem
            .embedding
            .chains()
            .iter()
            .map(|c| json!(c))
            .collect();
        let metadata = BTreeMap::from([
            ("generated_by".to_string(), json!("spinasm")),
            ("chains".to_string(), Value::Array(chains)),
        ]);
        Self {
            version: BQPJSON_VERSION.to_string(),
            id: 0,
            metadata,
            variable_ids: problem.qubits().into_iter().collect(),
            variable_domain: domain(Mode::Ising),
            scale: 1.0 / factor,
            offset: problem.simple_offset * factor,
            linear_terms: problem
                .weights
                .iter()
                .map(|(&id, &coeff)| LinearTerm { id, coeff })
                .collect(),
            quadratic_terms: problem
                .strengths
                .iter()
                .map(|(p, &coeff)| QuadraticTerm {
                    id_tail: p.lo(),
                    id_head: p.hi(),
                    coeff,
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
