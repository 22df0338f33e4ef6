use thiserror::Error;

/// Errors from payload encoding and validation.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("truncated payload: {0} bytes")]
    Truncated(usize),

    #[error("bad magic: expected {expected}, got {actual}")]
    BadMagic { expected: String, actual: String },

    #[error("header decode failed: {0}")]
    Header(String),

    #[error("element buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    #[error("dimension mismatch: header says {declared}, vector has {actual}")]
    Dimension { declared: usize, actual: usize },

    #[error("empty shape dimension")]
    ZeroDimension,

    #[error("archive error: {0}")]
    Archive(String),

    #[error("manifest missing from archive")]
    MissingManifest,

    #[error("manifest entry not present in archive: {0}")]
    MissingEntry(String),

    #[error("content hash mismatch for entry {path}: expected {expected}, got {actual}")]
    EntryHash {
        path: String,
        expected: String,
        actual: String,
    },
}

pub type CodecResult<T> = Result<T, CodecError>;
