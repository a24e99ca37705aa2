mod common;

use spinasm::backend::SolveParams;
use spinasm::embed::{CancelToken, EmbedOptions, TargetGraph};
use spinasm::{BinOp, CompileOptions, Compiler, Expr, Spin, Stmt};
use std::collections::BTreeMap;

// S and E are the two ends; # is wall.
const MAZE: [&str; 5] = [
    "S..#.",
    "#.##.",
    "#...#",
    "..#..",
    "#.#.E",
];

fn cell(r: usize, c: usize) -> String {
    format!("r{r}c{c}")
}

fn open(r: usize, c: usize) -> bool {
    MAZE.get(r)
        .and_then(|row| row.as_bytes().get(c))
        .is_some_and(|&b| b != b'#')
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Lit cells cost a little; lit neighbours reward each other. With both
    // ends pinned lit, the cheapest state lights the corridor between them.
    let mut program = vec![];
    let mut locations = BTreeMap::new();
    let mut ends = vec![];
    for (r, row) in MAZE.iter().enumerate() {
        for (c, b) in row.bytes().enumerate() {
            if b == b'#' {
                continue;
            }
            program.push(Stmt::weight(cell(r, c), 0.5));
            locations.insert(cell(r, c), (c as f64, r as f64));
            if open(r, c + 1) {
                program.push(Stmt::strength(cell(r, c), cell(r, c + 1), -1.0));
            }
            if open(r + 1, c) {
                program.push(Stmt::strength(cell(r, c), cell(r + 1, c), -1.0));
            }
            if b == b'S' || b == b'E' {
                program.push(Stmt::pin(cell(r, c), true));
                ends.push(Expr::var(cell(r, c)));
            }
        }
    }
    if let [s, e] = &ends[..] {
        program.push(Stmt::Assert(Expr::binary(BinOp::And, s.clone(), e.clone())));
    }

    let options = CompileOptions {
        embed: EmbedOptions::Layout {
            locations,
            seed: 1,
            max_rounds: 32,
            radius: 1,
        },
        ..CompileOptions::default()
    };
    let target = TargetGraph::chimera(4, 4, 4);
    let compiled = Compiler::new(options).compile(&program, &target, &CancelToken::new())?;
    print!("{}", compiled.stats);

    let solver = common::Annealer { seed: 3, sweeps: 500 };
    let report = compiled.run(&solver, &SolveParams { sample_count: 50, ..SolveParams::default() })?;
    let Some(best) = report.best() else {
        println!("no valid solution among {} samples", report.stats.total);
        return Ok(());
    };
    println!("energy {:.3}", best.energy);
    for (r, row) in MAZE.iter().enumerate() {
        let line: String = row
            .bytes()
            .enumerate()
            .map(|(c, b)| match (b, best.value(&cell(r, c))) {
                (b'#', _) => '#',
                (_, Some(Spin::Up)) => '*',
                (_, Some(Spin::Down)) => '.',
                (_, None) => '?',
            })
            .collect();
        println!("{line}");
    }
    Ok(())
}
