use thiserror::Error;

/// Errors from vector index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("dimension mismatch: namespace is {expected}-dim, vector is {actual}-dim")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("empty vector")]
    EmptyVector,

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type IndexResult<T> = Result<T, IndexError>;
