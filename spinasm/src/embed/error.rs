use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmbedError {
    #[error("no embedding found after {trials} trial(s)")]
    NoEmbedding { trials: usize },

    #[error("embedding was cancelled before any valid placement was found")]
    Cancelled,

    #[error("target graph has no qubits")]
    EmptyTarget,

    #[error("{vars} logical variables cannot fit on {qubits} qubits")]
    TooLarge { vars: usize, qubits: usize },

    #[error("layout embedding needs a location for at least one variable")]
    MissingLocations,

    #[error("layout embedding needs a target with a known Chimera shape")]
    NotChimera,

    #[error("invalid embedding: {0}")]
    Invalid(String),
}
