//! Evaluation and rendering of assertion expressions.

use crate::{BinOp, Expr, UnOp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Why an assertion could not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("`{0}` has no value in this solution")]
    Unknown(String),
    #[error("division by zero")]
    DivideByZero,
    #[error("dividing {0} by {1} overflows")]
    Overflow(i64, i64),
    #[error("shift amount {0} out of range")]
    BadShift(i64),
}

/// Outcome of checking one assertion against one solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertOutcome {
    pub text: String,
    pub passed: bool,
    /// Set when evaluation failed instead of producing `false`.
    pub error: Option<String>,
}

impl Expr {
    /// Evaluate against a name -> bit mapping. `None` bits belong to broken chains.
    pub fn eval(&self, env: &BTreeMap<String, Option<bool>>) -> Result<i64, EvalError> {
        match self {
            Expr::Num(n) => Ok(*n),
            Expr::Var(name) => match env.get(name) {
                Some(Some(b)) => Ok(*b as i64),
                _ => Err(EvalError::Unknown(name.clone())),
            },
            Expr::Unary(op, e) => {
                let v = e.eval(env)?;
                Ok(match op {
                    UnOp::Not => (v == 0) as i64,
                    UnOp::Neg => v.wrapping_neg(),
                })
            }
            Expr::Binary(op, a, b) => {
                // short-circuit like C
                match op {
                    BinOp::And => {
                        return Ok((a.eval(env)? != 0 && b.eval(env)? != 0) as i64);
                    }
                    BinOp::Or => {
                        return Ok((a.eval(env)? != 0 || b.eval(env)? != 0) as i64);
                    }
                    _ => {}
                }
                let x = a.eval(env)?;
                let y = b.eval(env)?;
                Ok(match op {
                    BinOp::Mul => x.wrapping_mul(y),
                    BinOp::Div | BinOp::Rem if y == 0 => return Err(EvalError::DivideByZero),
                    BinOp::Div => x.checked_div(y).ok_or(EvalError::Overflow(x, y))?,
                    BinOp::Rem => x.checked_rem(y).ok_or(EvalError::Overflow(x, y))?,
                    BinOp::Add => x.wrapping_add(y),
                    BinOp::Sub => x.wrapping_sub(y),
                    BinOp::Shl => x.wrapping_shl(shift_amount(y)?),
                    BinOp::Shr => x.wrapping_shr(shift_amount(y)?),
                    BinOp::Lt => (x < y) as i64,
                    BinOp::Le => (x <= y) as i64,
                    BinOp::Gt => (x > y) as i64,
                    BinOp::Ge => (x >= y) as i64,
                    BinOp::Eq => (x == y) as i64,
                    BinOp::Ne => (x != y) as i64,
                    BinOp::BitAnd => x & y,
                    BinOp::BitXor => x ^ y,
                    BinOp::BitOr => x | y,
                    BinOp::And | BinOp::Or => unreachable!("handled above"),
                })
            }
        }
    }

    /// Check the expression as an assertion: non-zero is success.
    pub fn check(&self, env: &BTreeMap<String, Option<bool>>) -> AssertOutcome {
        let text = self.to_string();
        match self.eval(env) {
            Ok(v) => AssertOutcome {
                text,
                passed: v != 0,
                error: None,
            },
            Err(e) => AssertOutcome {
                text,
                passed: false,
                error: Some(e.to_string()),
            },
        }
    }

    /// All variable names mentioned by the expression.
    pub fn names(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Num(_) => {}
            Expr::Var(n) => {
                out.insert(n.as_str());
            }
            Expr::Unary(_, e) => e.collect_names(out),
            Expr::Binary(_, a, b) => {
                a.collect_names(out);
                b.collect_names(out);
            }
        }
    }
}

fn shift_amount(y: i64) -> Result<u32, EvalError> {
    if (0..64).contains(&y) {
        Ok(y as u32)
    } else {
        Err(EvalError::BadShift(y))
    }
}

impl BinOp {
    /// Binding power; larger binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::BitOr => 3,
            BinOp::BitXor => 4,
            BinOp::BitAnd => 5,
            BinOp::Eq | BinOp::Ne => 6,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 7,
            BinOp::Shl | BinOp::Shr => 8,
            BinOp::Add | BinOp::Sub => 9,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 10,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::BitAnd => "&",
            BinOp::BitXor => "^",
            BinOp::BitOr => "|",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

const UNARY_PREC: u8 = 11;

impl Expr {
    fn prec(&self) -> u8 {
        match self {
            Expr::Num(_) | Expr::Var(_) => u8::MAX,
            Expr::Unary(..) => UNARY_PREC,
            Expr::Binary(op, ..) => op.precedence(),
        }
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        let paren = self.prec() < min;
        if paren {
            f.write_str("(")?;
        }
        match self {
            Expr::Num(n) => write!(f, "{}", n)?,
            Expr::Var(v) => f.write_str(v)?,
            Expr::Unary(op, e) => {
                f.write_str(match op {
                    UnOp::Not => "!",
                    UnOp::Neg => "-",
                })?;
                e.fmt_prec(f, UNARY_PREC)?;
            }
            Expr::Binary(op, a, b) => {
                // left-associative: the right operand needs strictly higher binding
                let p = op.precedence();
                a.fmt_prec(f, p)?;
                write!(f, " {} ", op.symbol())?;
                b.fmt_prec(f, p + 1)?;
            }
        }
        if paren {
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, Option<bool>)]) -> BTreeMap<String, Option<bool>> {
        pairs.iter().map(|(n, b)| (n.to_string(), *b)).collect()
    }

    #[test]
    fn test_eval_sum_equals() {
        // A + B == C
        let e = Expr::binary(
            BinOp::Eq,
            Expr::binary(BinOp::Add, Expr::var("A"), Expr::var("B")),
            Expr::var("C"),
        );
        let ok = env(&[("A", Some(true)), ("B", Some(false)), ("C", Some(true))]);
        assert_eq!(e.eval(&ok), Ok(1));
        let bad = env(&[("A", Some(true)), ("B", Some(true)), ("C", Some(true))]);
        assert!(!e.check(&bad).passed);
    }

    #[test]
    fn test_broken_bit_fails_with_message() {
        let e = Expr::var("A");
        let out = e.check(&env(&[("A", None)]));
        assert!(!out.passed);
        assert_eq!(out.error.as_deref(), Some("`A` has no value in this solution"));
    }

    #[test]
    fn test_division_by_zero() {
        let e = Expr::binary(BinOp::Div, Expr::Num(1), Expr::var("A"));
        assert_eq!(e.eval(&env(&[("A", Some(false))])), Err(EvalError::DivideByZero));
    }

    #[test]
    fn test_min_over_minus_one_overflows() {
        let e = Expr::binary(BinOp::Div, Expr::Num(i64::MIN), Expr::unary(UnOp::Neg, Expr::var("A")));
        let env = env(&[("A", Some(true))]);
        assert_eq!(e.eval(&env), Err(EvalError::Overflow(i64::MIN, -1)));
        let rem = Expr::binary(BinOp::Rem, Expr::Num(i64::MIN), Expr::Num(-1));
        assert_eq!(rem.eval(&env), Err(EvalError::Overflow(i64::MIN, -1)));
        assert_eq!(EvalError::Overflow(i64::MIN, -1).to_string(), "dividing -9223372036854775808 by -1 overflows");
    }

    #[test]
    fn test_short_circuit_skips_unknown() {
        let e = Expr::binary(BinOp::Or, Expr::Num(1), Expr::var("missing"));
        assert_eq!(e.eval(&BTreeMap::new()), Ok(1));
    }

    #[test]
    fn test_display_minimal_parens() {
        let e = Expr::binary(
            BinOp::Mul,
            Expr::binary(BinOp::Add, Expr::var("A"), Expr::var("B")),
            Expr::unary(UnOp::Not, Expr::var("C")),
        );
        assert_eq!(e.to_string(), "(A + B) * !C");
        let e = Expr::binary(
            BinOp::Sub,
            Expr::var("A"),
            Expr::binary(BinOp::Sub, Expr::var("B"), Expr::var("C")),
        );
        assert_eq!(e.to_string(), "A - (B - C)");
    }

    #[test]
    fn test_names() {
        let e = Expr::binary(BinOp::And, Expr::var("X"), Expr::var("Y"));
        assert_eq!(e.names().into_iter().collect::<Vec<_>>(), vec!["X", "Y"]);
    }
}
