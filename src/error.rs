use thiserror::Error;

use crate::digest::Digest;

/// Terminal failures of the proof engine.
///
/// A verifier either succeeds (returning `true` or a new committed root) or
/// fails with one of these. None of them is recoverable at the engine level;
/// callers decide whether to retry with a fresh witness.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Error)]
#[non_exhaustive]
pub enum ProofError {
    #[error("operation requires a non-empty vector")]
    EmptyTree,

    #[error("claimed element count and root emptiness disagree")]
    InvalidTree,

    #[error("parallel element lists must have equal length: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("witness does not reconstruct the claimed root")]
    InvalidProof,
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum TryFromDigestError {
    #[error("expected {bytes} bytes, but got {0}", bytes = Digest::BYTES)]
    InvalidLength(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum TryFromHexDigestError {
    #[error("not valid hex")]
    HexDecode(#[from] hex::FromHexError),

    #[error("decoded bytes do not form a digest")]
    Digest(#[from] TryFromDigestError),
}
