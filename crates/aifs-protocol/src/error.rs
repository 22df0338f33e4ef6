use thiserror::Error;

/// Errors from protocol encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("framing error: {0}")]
    FramingError(String),

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
