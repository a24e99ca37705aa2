//! Errors raised while building and simplifying the logical problem.

use crate::symbols::SymbolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// An assertion mentions a name that no statement defines.
    #[error("assertion `{assertion}` refers to undefined variable `{name}`")]
    UnboundName { name: String, assertion: String },
    /// The same variable is pinned both ways.
    #[error("variable `{0}` is pinned to both true and false")]
    ConflictingPin(String),
    #[error(transparent)]
    Symbol(#[from] SymbolError),
}

#[derive(Debug, Error)]
pub enum SimplifyError {
    /// Two constraints force different values onto the same variable.
    #[error("contradiction: {names} cannot be both {first} and {second}")]
    Contradiction {
        names: String,
        first: bool,
        second: bool,
    },
    #[error(transparent)]
    Symbol(#[from] SymbolError),
}
