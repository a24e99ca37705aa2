mod common;

use spinasm::backend::SolveParams;
use spinasm::embed::{CancelToken, TargetGraph};
use spinasm::{CompileOptions, Compiler};
use spinasm_macros::spinasm;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Y = NOT X: the antiferromagnetic coupling makes the two disagree.
    let program = spinasm! {
        X Y 1;
        X := true;
        assert X != Y;
    };

    let target = TargetGraph::chimera(2, 2, 4);
    let compiled = Compiler::new(CompileOptions::default()).compile(&program, &target, &CancelToken::new())?;
    print!("{}", compiled.stats);
    for row in compiled.embedding_table() {
        println!("  {:<10} -> {:?}", row.names.join(" "), row.qubits);
    }

    let solver = common::Annealer { seed: 7, sweeps: 200 };
    let report = compiled.run(&solver, &SolveParams { sample_count: 100, ..SolveParams::default() })?;
    for s in &report.solutions {
        println!("solution {} (energy {:.3}, seen {}x)", s.id, s.energy, s.occurrences);
        print!("{}", s.render(report.mode));
    }
    println!("{:?}", report.stats);
    Ok(())
}
