use aifs_meta::TxState;
use aifs_types::{AssetId, TxId};
use thiserror::Error;

/// Errors from transaction operations.
#[derive(Debug, Error)]
pub enum TxError {
    #[error("transaction not found: {0}")]
    NotFound(TxId),

    #[error("transaction {tx_id} is {state}, operation requires {required}")]
    InvalidState {
        tx_id: TxId,
        state: TxState,
        required: &'static str,
    },

    #[error("commit blocked: {0:?} not visible")]
    UnmetDependencies(Vec<AssetId>),

    #[error("metadata error: {0}")]
    Meta(#[from] aifs_meta::MetaError),
}

pub type TxResult<T> = Result<T, TxError>;
