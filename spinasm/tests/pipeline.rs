mod common;

use common::{raw_sample, DownSolver, ExhaustiveSolver};
use spinasm::backend::{BackendError, RawResults, SolveParams};
use spinasm::decode::DecodeOptions;
use spinasm::embed::{CancelToken, EmbedOptions, TargetGraph};
use spinasm::{CompileError, CompileOptions, Compiled, Compiler, Mode, Spin, Stmt};

fn compile(program: &[Stmt], options: CompileOptions, target: &TargetGraph) -> Compiled {
    Compiler::new(options)
        .compile(program, target, &CancelToken::new())
        .unwrap()
}

fn qubo() -> CompileOptions {
    CompileOptions {
        mode: Mode::Qubo,
        ..CompileOptions::default()
    }
}

fn one_sample(spins: Vec<i8>, energy: f64) -> RawResults {
    RawResults {
        spin_vectors: vec![spins],
        energies: vec![energy],
        occurrence_counts: vec![1],
        broken_count: 0,
    }
}

// A 1, B -1, A B 2 in QUBO form on a single coupler.
fn two_variable_program() -> Vec<Stmt> {
    vec![
        Stmt::weight("A", 1.0),
        Stmt::weight("B", -1.0),
        Stmt::strength("A", "B", 2.0),
    ]
}

#[test]
fn test_two_variable_qubo_compiles_onto_one_coupler() {
    let target = TargetGraph::from_edges([(0, 1)]);
    let c = compile(&two_variable_program(), qubo(), &target);

    let a = c.symbols.lookup("A").unwrap();
    let b = c.symbols.lookup("B").unwrap();
    assert_eq!(c.logical.mode, Mode::Ising);
    assert_eq!(c.logical.simple_offset, 0.5);
    assert_eq!(c.logical.weight(a), 1.0);
    assert_eq!(c.logical.weight(b), 0.0);
    assert_eq!(c.logical.strength(a, b), 0.5);
    assert!(c.logical.known_values.is_empty());

    assert_eq!(c.physical.embedding.chain(a).len(), 1);
    assert_eq!(c.physical.embedding.chain(b).len(), 1);
    assert_eq!(c.physical.scale_factor, 1.0);
    assert_eq!(c.stats.physical_qubits, 2);
}

#[test]
fn test_two_variable_qubo_decodes_hand_written_sample() {
    let target = TargetGraph::from_edges([(0, 1)]);
    let c = compile(&two_variable_program(), qubo(), &target);
    let qa = c.physical.embedding.chain(c.symbols.lookup("A").unwrap())[0];
    let qb = c.physical.embedding.chain(c.symbols.lookup("B").unwrap())[0];

    // h_A * 1 + J_AB * (1 * -1) = 0.5 before the offset
    let report = c.decode(&one_sample(raw_sample(2, &[(qa, 1), (qb, -1)]), 0.5)).unwrap();
    let best = report.best().unwrap();
    assert_eq!(best.value("A"), Some(Spin::Up));
    assert_eq!(best.value("B"), Some(Spin::Down));
    assert_eq!(best.energy, 1.0);
    assert_eq!(best.id.to_string(), "2");
    assert_eq!(best.render(Mode::Qubo), "A = 1\nB = 0\n");
}

#[test]
fn test_two_variable_qubo_ground_state() {
    let target = TargetGraph::from_edges([(0, 1)]);
    let c = compile(&two_variable_program(), qubo(), &target);
    let report = c.run(&ExhaustiveSolver, &SolveParams::default()).unwrap();

    assert_eq!(report.solutions.len(), 1);
    let best = report.best().unwrap();
    assert_eq!(best.value("A"), Some(Spin::Down));
    assert_eq!(best.value("B"), Some(Spin::Up));
    assert_eq!(best.energy, -1.0);
    assert_eq!(report.stats.total, 4);
    assert_eq!(report.stats.at_min_energy, 1);
}

#[test]
fn test_pinned_not_gate() {
    let prog = vec![
        Stmt::strength("A", "B", 1.0),
        Stmt::pin("A", true),
        Stmt::Assert(spinasm::Expr::binary(
            spinasm::BinOp::Ne,
            spinasm::Expr::var("A"),
            spinasm::Expr::var("B"),
        )),
    ];
    let c = compile(&prog, CompileOptions::default(), &TargetGraph::chimera(1, 1, 4));
    let report = c.run(&ExhaustiveSolver, &SolveParams::default()).unwrap();

    let best = report.best().unwrap();
    assert_eq!(best.value("A"), Some(Spin::Up));
    assert_eq!(best.value("B"), Some(Spin::Down));
    assert!(best.passes_assertions());
    assert_eq!(best.values.keys().collect::<Vec<_>>(), ["A", "B"]);
    assert!(report.solutions.iter().all(|s| s.passes_assertions()));
}

#[test]
fn test_aliased_chain_reports_both_names() {
    let prog = vec![
        Stmt::strength("A", "B", -1.0),
        Stmt::chain("B", "C"),
        Stmt::strength("C", "D", 1.0),
        Stmt::pin("A", true),
    ];
    let c = compile(&prog, CompileOptions::default(), &TargetGraph::chimera(1, 1, 4));
    assert_eq!(c.stats.logical_chains, 0);
    assert_eq!(c.symbols.lookup("B"), c.symbols.lookup("C"));

    let report = c.run(&ExhaustiveSolver, &SolveParams::default()).unwrap();
    let best = report.best().unwrap();
    assert_eq!(best.value("B"), Some(Spin::Up));
    assert_eq!(best.value("C"), Some(Spin::Up));
    assert_eq!(best.value("D"), Some(Spin::Down));
}

#[test]
fn test_broken_chain_is_filtered_unless_asked_for() {
    // a triangle on a 4-cycle needs one chain of two qubits
    let prog = vec![
        Stmt::strength("A", "B", 1.0),
        Stmt::strength("B", "C", 1.0),
        Stmt::strength("A", "C", 1.0),
    ];
    let target = TargetGraph::from_edges([(0, 1), (1, 2), (2, 3), (3, 0)]);
    let mut c = compile(&prog, CompileOptions::default(), &target);
    let row = c
        .embedding_table()
        .into_iter()
        .find(|row| row.qubits.len() == 2)
        .unwrap();
    let raw = one_sample(raw_sample(4, &[(row.qubits[0], 1), (row.qubits[1], -1)]), 0.0);

    let report = c.decode(&raw).unwrap();
    assert!(report.solutions.is_empty());
    assert_eq!(report.stats.not_broken, 0);

    c.options.decode = DecodeOptions {
        all_solutions: true,
        ..DecodeOptions::default()
    };
    let report = c.decode(&raw).unwrap();
    let s = report.best().unwrap();
    assert_eq!(s.broken_chains, row.names);
    assert_eq!(s.value(&row.names[0]), None);
}

#[test]
fn test_duplicate_samples_merge() {
    let target = TargetGraph::from_edges([(0, 1)]);
    let mut c = compile(&two_variable_program(), qubo(), &target);
    let raw = RawResults {
        spin_vectors: vec![vec![1, 1], vec![1, 1], vec![-1, -1]],
        energies: vec![1.5, 1.5, 0.5],
        occurrence_counts: vec![3, 4, 1],
        broken_count: 2,
    };
    c.options.decode.lowest_only = false;
    let report = c.decode(&raw).unwrap();
    assert_eq!(report.solutions.len(), 2);
    assert_eq!(report.solutions[1].occurrences, 7);
    assert_eq!(report.stats.total, 8);
    assert_eq!(report.stats.discarded, 2);
    assert_eq!(report.stats.distinct, 2);
}

#[test]
fn test_backend_failure_surfaces() {
    let target = TargetGraph::from_edges([(0, 1)]);
    let c = compile(&two_variable_program(), qubo(), &target);
    let err = c.run(&DownSolver, &SolveParams::default()).unwrap_err();
    assert!(matches!(err, CompileError::Backend(BackendError::Connection(_))));
}

#[test]
fn test_target_too_small() {
    let prog = vec![
        Stmt::strength("A", "B", 1.0),
        Stmt::strength("B", "C", 1.0),
        Stmt::strength("A", "C", 1.0),
    ];
    let err = Compiler::default()
        .compile(&prog, &TargetGraph::from_edges([(0, 1)]), &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, CompileError::Embed(_)));
}

#[test]
fn test_layout_strategy_follows_locations() {
    // a corridor of four cells running left to right
    let names = ["r.0", "r.1", "r.2", "r.3"];
    let mut prog: Vec<Stmt> = names
        .windows(2)
        .map(|w| Stmt::strength(w[0], w[1], -1.0))
        .collect();
    prog.push(Stmt::pin("r.0", true));
    let locations = names
        .iter()
        .enumerate()
        .map(|(x, n)| (n.to_string(), (x as f64, 0.0)))
        .collect();
    let options = CompileOptions {
        embed: EmbedOptions::Layout {
            locations,
            seed: 3,
            max_rounds: 32,
            radius: 1,
        },
        ..CompileOptions::default()
    };
    let target = TargetGraph::chimera(1, 4, 4);
    let c = compile(&prog, options, &target);

    let cols = |name: &str| -> Vec<usize> {
        c.physical
            .embedding
            .chain(c.symbols.lookup(name).unwrap())
            .iter()
            .map(|&q| target.cell_of(q).unwrap().1)
            .collect()
    };
    assert!(cols("r.0").iter().any(|&col| col <= 1));
    assert!(cols("r.3").iter().any(|&col| col >= 2));

    let report = c.run(&ExhaustiveSolver, &SolveParams::default()).unwrap();
    let best = report.best().unwrap();
    assert!(names.iter().all(|n| best.value(n) == Some(Spin::Up)));
}

#[test]
fn test_options_from_json_drive_compile() {
    let options = CompileOptions::from_json(
        r#"{"mode": "qubo", "embed": {"strategy": "dense", "trials": 2, "seed": 5}}"#,
    )
    .unwrap();
    let target = TargetGraph::from_edges([(0, 1)]);
    let c = compile(&two_variable_program(), options, &target);
    assert_eq!(c.program_text().unwrap(), "A 1\nB -1\nA B 2\n");

    let json: serde_json::Value = serde_json::from_str(&c.bqpjson().to_json().unwrap()).unwrap();
    assert_eq!(json["variable_domain"], "spin");
    assert_eq!(json["linear_terms"].as_array().unwrap().len(), 1);
}
