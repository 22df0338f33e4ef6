use aifs_types::AssetId;
use thiserror::Error;

/// Errors from chunk store operations.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("chunk not found: {0}")]
    NotFound(AssetId),

    #[error("integrity failure for chunk {id}: {reason}")]
    Integrity { id: AssetId, reason: String },

    #[error("corruption: chunk {id} re-hashed to {actual}")]
    Corruption { id: AssetId, actual: String },

    #[error("invalid compression level {0}, valid range is 1..=22")]
    InvalidLevel(i32),

    #[error("kms error: {0}")]
    Kms(#[from] aifs_crypto::KmsError),

    #[error("sidecar decode failed for chunk {id}: {reason}")]
    Sidecar { id: AssetId, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ChunkResult<T> = Result<T, ChunkError>;
