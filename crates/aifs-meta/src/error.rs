use aifs_types::AssetId;
use thiserror::Error;

/// Errors from metadata store operations.
#[derive(Debug, Error)]
pub enum MetaError {
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("{what} already exists: {id}")]
    AlreadyExists { what: &'static str, id: String },

    #[error("precondition failed: {0}")]
    FailedPrecondition(String),

    #[error("lineage cycle: adding parent {parent} to {child}")]
    CycleDetected { child: AssetId, parent: AssetId },

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("sqlite error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MetaResult<T> = Result<T, MetaError>;
