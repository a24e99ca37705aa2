//! Top-level compile error.

use crate::backend::BackendError;
use crate::embed::EmbedError;
use crate::logical::{BuildError, SimplifyError};
use crate::symbols::SymbolError;
use thiserror::Error;

/// Anything that stops a program from reaching, or coming back from, the hardware.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Unbound names and conflicting pins in the program itself
    #[error(transparent)]
    Build(#[from] BuildError),
    /// Contradictions found while simplifying
    #[error(transparent)]
    Simplify(#[from] SimplifyError),
    /// No embedding, or an embedding that fails validation
    #[error(transparent)]
    Embed(#[from] EmbedError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Symbol(#[from] SymbolError),
    #[error("invalid options: {0}")]
    Options(#[from] serde_json::Error),
    #[error("nothing to optimize: every weight and strength is zero")]
    NothingToDo,
    #[error("variables with no coupling to anything else: {}", .0.join(", "))]
    Disconnected(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = CompileError::Disconnected(vec!["A".into(), "B".into()]);
        assert_eq!(e.to_string(), "variables with no coupling to anything else: A, B");
        let e: CompileError = EmbedError::NoEmbedding { trials: 10 }.into();
        assert_eq!(e.to_string(), "no embedding found after 10 trial(s)");
    }
}
