use crate::logical::error::BuildError;
use crate::problem::{Pair, Problem};
use crate::symbols::SymbolTable;
use crate::{Mode, Spin, Stmt};
use tracing::debug;

/// Folds statements, in program order, into a logical problem.
pub(crate) struct Builder<'a> {
    symbols: &'a mut SymbolTable,
    problem: Problem,
}

impl<'a> Builder<'a> {
    pub(crate) fn new(symbols: &'a mut SymbolTable, mode: Mode) -> Self {
        Self {
            symbols,
            problem: Problem::new(mode),
        }
    }

    pub(crate) fn fold(&mut self, st: &Stmt) -> Result<(), BuildError> {
        match st {
            Stmt::Weight { var, value } => {
                let i = self.symbols.intern(var);
                self.problem.add_weight(i, *value);
            }
            Stmt::Strength { a, b, value } => {
                let i = self.symbols.intern(a);
                let j = self.symbols.intern(b);
                self.problem.add_strength(i, j, *value);
            }
            Stmt::Chain { a, b } => {
                let i = self.symbols.intern(a);
                let j = self.symbols.intern(b);
                if i != j {
                    self.problem.chains.insert(Pair::new(i, j));
                }
            }
            Stmt::Pin { var, value } => {
                let i = self.symbols.intern(var);
                let spin = Spin::from_bool(*value);
                if let Some(prev) = self.problem.pinned.insert(i, spin) {
                    if prev != spin {
                        return Err(BuildError::ConflictingPin(var.clone()));
                    }
                }
            }
            Stmt::Assert(e) => self.problem.assertions.push(e.clone()),
        }
        Ok(())
    }

    /// Check assertion names once every statement has been seen.
    pub(crate) fn finish(self) -> Result<Problem, BuildError> {
        for a in &self.problem.assertions {
            if let Some(name) = a.names().into_iter().find(|n| self.symbols.lookup(n).is_none()) {
                return Err(BuildError::UnboundName {
                    name: name.to_string(),
                    assertion: a.to_string(),
                });
            }
        }
        debug!(
            vars = self.symbols.len(),
            weights = self.problem.weights.len(),
            strengths = self.problem.strengths.len(),
            chains = self.problem.chains.len(),
            pins = self.problem.pinned.len(),
            assertions = self.problem.assertions.len(),
            "logical problem built"
        );
        Ok(self.problem)
    }
}

/// Build a logical problem from a program.
pub fn build_problem(
    program: &[Stmt],
    mode: Mode,
    symbols: &mut SymbolTable,
) -> Result<Problem, BuildError> {
    let mut b = Builder::new(symbols, mode);
    for st in program {
        b.fold(st)?;
    }
    b.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BinOp, Expr};

    #[test]
    fn test_build_accumulates_terms() {
        let prog = vec![
            Stmt::weight("A", 1.0),
            Stmt::weight("A", 0.5),
            Stmt::strength("A", "B", 2.0),
            Stmt::strength("B", "A", -1.0),
            Stmt::chain("B", "C"),
            Stmt::pin("C", true),
        ];
        let mut syms = SymbolTable::new();
        let p = build_problem(&prog, Mode::Ising, &mut syms).unwrap();
        assert_eq!(p.weight(0), 1.5);
        assert_eq!(p.strength(0, 1), 1.0);
        assert!(p.chains.contains(&Pair::new(1, 2)));
        assert_eq!(p.pinned.get(&2), Some(&Spin::Up));
    }

    #[test]
    fn test_self_chain_is_noop() {
        let mut syms = SymbolTable::new();
        let p = build_problem(&[Stmt::chain("A", "A")], Mode::Ising, &mut syms).unwrap();
        assert!(p.chains.is_empty());
    }

    #[test]
    fn test_conflicting_pins() {
        let prog = vec![Stmt::pin("A", true), Stmt::pin("A", false)];
        let mut syms = SymbolTable::new();
        let err = build_problem(&prog, Mode::Ising, &mut syms).unwrap_err();
        assert!(matches!(err, BuildError::ConflictingPin(n) if n == "A"));
    }

    #[test]
    fn test_assertion_with_unbound_name() {
        let prog = vec![
            Stmt::weight("A", 1.0),
            Stmt::Assert(Expr::binary(BinOp::Eq, Expr::var("A"), Expr::var("Q"))),
        ];
        let mut syms = SymbolTable::new();
        let err = build_problem(&prog, Mode::Ising, &mut syms).unwrap_err();
        assert!(matches!(err, BuildError::UnboundName { name, .. } if name == "Q"));
    }

    #[test]
    fn test_assertion_may_precede_definition() {
        let prog = vec![Stmt::Assert(Expr::var("A")), Stmt::weight("A", 1.0)];
        let mut syms = SymbolTable::new();
        assert!(build_problem(&prog, Mode::Ising, &mut syms).is_ok());
    }
}
