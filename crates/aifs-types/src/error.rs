use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown asset kind: {0}")]
    UnknownKind(String),

    #[error("invalid uri: {0}")]
    InvalidUri(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
