use thiserror::Error;

use aifs_chunk::ChunkError;
use aifs_meta::MetaError;
use aifs_tx::TxError;

/// Engine-level errors, aligned with the RPC status taxonomy.
///
/// Lower layers raise primitive kinds; this enum is the engine's mapping
/// of those into what a client sees. The server translates each variant
/// onto the matching status code.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("{what} already exists: {id}")]
    AlreadyExists { what: &'static str, id: String },

    #[error("precondition failed: {0}")]
    FailedPrecondition(String),

    #[error("integrity failure: {0}")]
    Integrity(String),

    #[error("aborted: {0}")]
    Aborted(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<ChunkError> for EngineError {
    fn from(e: ChunkError) -> Self {
        match e {
            ChunkError::NotFound(id) => Self::NotFound {
                what: "chunk",
                id: id.to_hex(),
            },
            ChunkError::InvalidLevel(level) => {
                Self::InvalidArgument(format!("compression level {level} out of range"))
            }
            ChunkError::Integrity { .. } | ChunkError::Corruption { .. } => {
                Self::Integrity(e.to_string())
            }
            ChunkError::Io(_) | ChunkError::Kms(_) => Self::Unavailable(e.to_string()),
            ChunkError::Sidecar { .. } => Self::Internal(e.to_string()),
        }
    }
}

impl From<MetaError> for EngineError {
    fn from(e: MetaError) -> Self {
        match e {
            MetaError::NotFound { what, id } => Self::NotFound { what, id },
            MetaError::AlreadyExists { what, id } => Self::AlreadyExists { what, id },
            MetaError::FailedPrecondition(msg) => Self::FailedPrecondition(msg),
            MetaError::CycleDetected { child, parent } => Self::FailedPrecondition(format!(
                "lineage cycle: {child} cannot descend from {parent}"
            )),
            MetaError::InvalidRecord(msg) => Self::Internal(msg),
            MetaError::Sql(_) | MetaError::Io(_) => Self::Unavailable(e.to_string()),
        }
    }
}

impl From<TxError> for EngineError {
    fn from(e: TxError) -> Self {
        match e {
            TxError::NotFound(tx_id) => Self::NotFound {
                what: "transaction",
                id: tx_id.to_string(),
            },
            TxError::UnmetDependencies(_) => Self::FailedPrecondition(e.to_string()),
            TxError::InvalidState { .. } => Self::FailedPrecondition(e.to_string()),
            TxError::Meta(inner) => inner.into(),
        }
    }
}

impl From<aifs_codec::CodecError> for EngineError {
    fn from(e: aifs_codec::CodecError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

impl From<aifs_index::IndexError> for EngineError {
    fn from(e: aifs_index::IndexError) -> Self {
        match e {
            aifs_index::IndexError::DimensionMismatch { .. }
            | aifs_index::IndexError::EmptyVector => Self::InvalidArgument(e.to_string()),
            aifs_index::IndexError::Persistence(_) | aifs_index::IndexError::Io(_) => {
                Self::Unavailable(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aifs_types::AssetId;

    #[test]
    fn chunk_not_found_maps() {
        let err: EngineError = ChunkError::NotFound(AssetId::from_bytes(b"x")).into();
        assert!(matches!(err, EngineError::NotFound { what: "chunk", .. }));
    }

    #[test]
    fn cycle_maps_to_failed_precondition() {
        let err: EngineError = MetaError::CycleDetected {
            child: AssetId::from_bytes(b"a"),
            parent: AssetId::from_bytes(b"b"),
        }
        .into();
        assert!(matches!(err, EngineError::FailedPrecondition(_)));
    }

    #[test]
    fn codec_maps_to_invalid_argument() {
        let err: EngineError = aifs_codec::CodecError::Truncated(3).into();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }
}
