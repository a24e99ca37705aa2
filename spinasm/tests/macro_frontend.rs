mod common;

use common::ExhaustiveSolver;
use spinasm::backend::SolveParams;
use spinasm::embed::{CancelToken, TargetGraph};
use spinasm::logical::SimplifyError;
use spinasm::{BinOp, CompileError, CompileOptions, Compiler, Expr, Mode, Spin, Stmt, UnOp};
use spinasm_macros::spinasm;

#[test]
fn test_statement_forms() {
    let prog = spinasm! {
        A 1;
        B -0.5;
        A B -2.5;
        A = C;
        half.sum := true;
        D := 0;
    };
    assert_eq!(
        prog,
        vec![
            Stmt::weight("A", 1.0),
            Stmt::weight("B", -0.5),
            Stmt::strength("A", "B", -2.5),
            Stmt::chain("A", "C"),
            Stmt::pin("half.sum", true),
            Stmt::pin("D", false),
        ]
    );
}

#[test]
fn test_assertion_precedence() {
    let prog = spinasm! {
        assert A + B * 2 == C && !D || E << 1 >= 2;
    };
    let v = Expr::var;
    let expected = Expr::binary(
        BinOp::Or,
        Expr::binary(
            BinOp::And,
            Expr::binary(
                BinOp::Eq,
                Expr::binary(BinOp::Add, v("A"), Expr::binary(BinOp::Mul, v("B"), Expr::Num(2))),
                v("C"),
            ),
            Expr::unary(UnOp::Not, v("D")),
        ),
        Expr::binary(
            BinOp::Ge,
            Expr::binary(BinOp::Shl, v("E"), Expr::Num(1)),
            Expr::Num(2),
        ),
    );
    assert_eq!(prog, vec![Stmt::Assert(expected)]);
}

#[test]
fn test_assertion_grouping_and_literals() {
    let prog = spinasm! {
        assert (A - B) - -C != true;
    };
    let expected = Expr::binary(
        BinOp::Ne,
        Expr::binary(
            BinOp::Sub,
            Expr::binary(BinOp::Sub, Expr::var("A"), Expr::var("B")),
            Expr::unary(UnOp::Neg, Expr::var("C")),
        ),
        Expr::Num(1),
    );
    assert_eq!(prog, vec![Stmt::Assert(expected)]);
    assert_eq!(prog[0].to_string(), "!assert A - B - -C != 1");
}

#[test]
fn test_and_gate_with_pinned_inputs() {
    // x AND y = z as a QUBO penalty: xy - 2xz - 2yz + 3z
    let prog = spinasm! {
        Z 3;
        X Y 1;
        X Z -2;
        Y Z -2;
        X := true;
        Y := true;
        assert Z == (X & Y);
    };
    let options = CompileOptions {
        mode: Mode::Qubo,
        ..CompileOptions::default()
    };
    let c = Compiler::new(options)
        .compile(&prog, &TargetGraph::chimera(1, 1, 4), &CancelToken::new())
        .unwrap();
    let report = c.run(&ExhaustiveSolver, &SolveParams::default()).unwrap();

    let best = report.best().unwrap();
    for name in ["X", "Y", "Z"] {
        assert_eq!(best.value(name), Some(Spin::Up), "{name}");
    }
    assert!(best.is_valid());
    // the enumeration includes wrong answers
    assert!(report.stats.assertion_failures > 0);
    assert!(best.render(Mode::Qubo).contains("Z = 1"));
}

#[test]
fn test_contradictory_chain_pins() {
    let prog = spinasm! {
        X = Y;
        Y = Z;
        X Q 1;
        X := true;
        Z := false;
    };
    let err = Compiler::default()
        .compile(&prog, &TargetGraph::chimera(1, 1, 4), &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, CompileError::Simplify(SimplifyError::Contradiction { .. })));
}
