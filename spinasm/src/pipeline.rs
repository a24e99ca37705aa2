//! The compile driver: program -> logical problem -> embedding -> physical problem.

use crate::backend::{RawResults, SolveParams, Solver};
use crate::config::CompileOptions;
use crate::decode::{DecodeReport, Decoder};
use crate::embed::{embed, CancelToken, LogicalGraph, TargetGraph};
use crate::emit::{self, BqpJson};
use crate::error::CompileError;
use crate::logical::{
    assign_strengths, build_problem, find_disconnected, is_degenerate, pin_with_helpers, simplify,
    Strengths,
};
use crate::physical::PhysicalProblem;
use crate::problem::Problem;
use crate::stats::CompileStats;
use crate::symbols::SymbolTable;
use crate::{Mode, Stmt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    pub options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Compile `program` for `target`. Nothing here talks to a solver.
    pub fn compile(
        &self,
        program: &[Stmt],
        target: &TargetGraph,
        cancel: &CancelToken,
    ) -> Result<Compiled, CompileError> {
        let opts = &self.options;
        let mut symbols = SymbolTable::new();

        // 1) build, with configured pins after the program's own statements
        let mut stmts = program.to_vec();
        stmts.extend(opts.extra_pins.iter().map(|(n, &v)| Stmt::pin(n.clone(), v)));
        let mut logical = build_problem(&stmts, opts.mode, &mut symbols)?.to_ising();
        info!(
            statements = stmts.len(),
            vars = symbols.len(),
            mode = ?opts.mode,
            "program built"
        );

        // 2) strengths and pin helpers
        let strengths = assign_strengths(&logical, opts.chain_strength, opts.pin_strength);
        pin_with_helpers(&mut logical, &mut symbols, strengths.pin);

        // 3) simplify
        let report = if opts.optimize {
            Some(simplify(&mut logical, &mut symbols, opts.fold_dominated)?)
        } else {
            None
        };

        // 4) reject what cannot be embedded meaningfully
        if is_degenerate(&logical) {
            return Err(CompileError::NothingToDo);
        }
        let loose = find_disconnected(&logical, &symbols);
        if !loose.is_empty() {
            return Err(CompileError::Disconnected(loose));
        }

        // 5) embed
        let graph = LogicalGraph::from_problem(&logical, symbols.len());
        let embedder = opts.embed.embedder(&symbols);
        debug!(
            strategy = embedder.name(),
            vars = graph.len(),
            edges = graph.edges().count(),
            qubits = target.num_qubits(),
            "embedding"
        );
        let embedding = embed(embedder.as_ref(), &graph, target, cancel)?;

        // 6) physical problem
        let mut physical = PhysicalProblem::reconcile(&logical, &embedding, target, strengths.chain)?;
        physical.scale(opts.limits);

        let stats = CompileStats::collect(&logical, symbols.len(), &physical, report);
        info!(
            qubits = stats.physical_qubits,
            couplers = stats.physical_couplers,
            max_chain = stats.max_chain_len,
            scale = stats.scale_factor,
            "compiled"
        );
        Ok(Compiled {
            mode: opts.mode,
            symbols,
            logical,
            physical,
            strengths,
            stats,
            options: opts.clone(),
        })
    }
}

/// One row of the logical -> physical mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingRow {
    pub index: usize,
    pub names: Vec<String>,
    pub qubits: Vec<usize>,
}

/// A compiled program, ready to be sent to a solver any number of times.
#[derive(Debug, Clone)]
pub struct Compiled {
    /// Mode the program was written in; `logical` is always Ising.
    pub mode: Mode,
    pub symbols: SymbolTable,
    pub logical: Problem,
    pub physical: PhysicalProblem,
    pub strengths: Strengths,
    pub stats: CompileStats,
    pub options: CompileOptions,
}

impl Compiled {
    pub fn solve(&self, solver: &dyn Solver, params: &SolveParams) -> Result<RawResults, CompileError> {
        Ok(solver.solve(&self.physical, params)?)
    }

    pub fn decode(&self, raw: &RawResults) -> Result<DecodeReport, CompileError> {
        let decoder = Decoder {
            problem: &self.logical,
            symbols: &self.symbols,
            embedding: &self.physical.embedding,
            mode: self.mode,
        };
        Ok(decoder.decode(raw, &self.options.decode)?)
    }

    /// [`Compiled::solve`] followed by [`Compiled::decode`].
    pub fn run(&self, solver: &dyn Solver, params: &SolveParams) -> Result<DecodeReport, CompileError> {
        let raw = self.solve(solver, params)?;
        self.decode(&raw)
    }

    pub fn embedding_table(&self) -> Vec<EmbeddingRow> {
        (0..self.symbols.len())
            .map(|index| EmbeddingRow {
                index,
                names: self.symbols.names_of(index).into_iter().map(str::to_string).collect(),
                qubits: self.physical.embedding.chain(index).to_vec(),
            })
            .collect()
    }

    /// The simplified program, in the mode it was written in.
    pub fn program_text(&self) -> Result<String, CompileError> {
        Ok(emit::program_text(&self.logical, &self.symbols, self.mode)?)
    }

    pub fn bqpjson(&self) -> BqpJson {
        BqpJson::from_physical(&self.physical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logical::SimplifyError;

    fn compile(program: &[Stmt], options: CompileOptions) -> Result<Compiled, CompileError> {
        Compiler::new(options).compile(program, &TargetGraph::chimera(2, 2, 4), &CancelToken::new())
    }

    #[test]
    fn test_nothing_to_do() {
        let err = compile(&[Stmt::pin("A", true)], CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::NothingToDo));
    }

    #[test]
    fn test_disconnected_variable() {
        let prog = [Stmt::strength("A", "B", 1.0), Stmt::weight("C", 1.0)];
        let err = compile(&prog, CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::Disconnected(names) if names == ["C"]));
    }

    #[test]
    fn test_contradiction_surfaces() {
        let prog = [
            Stmt::chain("X", "Y"),
            Stmt::chain("Y", "Z"),
            Stmt::pin("X", true),
            Stmt::pin("Z", false),
        ];
        let err = compile(&prog, CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::Simplify(SimplifyError::Contradiction { .. })));
    }

    #[test]
    fn test_unoptimized_chains_survive() {
        let prog = [
            Stmt::strength("A", "B", 1.0),
            Stmt::chain("B", "C"),
            Stmt::strength("C", "D", -1.0),
        ];
        let options = CompileOptions {
            optimize: false,
            ..CompileOptions::default()
        };
        let c = compile(&prog, options).unwrap();
        assert_eq!(c.symbols.len(), 4);
        assert_eq!(c.stats.logical_chains, 1);
        assert!(c.stats.simplify.is_none());
        assert!(!c.physical.chains.is_empty());
    }

    #[test]
    fn test_extra_pins_and_table() {
        let prog = [Stmt::strength("A", "B", 1.0)];
        let mut options = CompileOptions::default();
        options.extra_pins.insert("A".into(), true);
        let c = compile(&prog, options).unwrap();
        assert_eq!(c.logical.pinned.len(), 2);
        let table = c.embedding_table();
        assert_eq!(table.len(), 3);
        assert!(table.iter().all(|row| !row.qubits.is_empty()));
        assert!(c.program_text().unwrap().contains("A := true"));
    }
}
