//! Transaction manager for AIFS.
//!
//! Enforces the strong-causality rule: an asset that declares parents
//! becomes visible only after every parent is visible. The manager keeps a
//! two-tier record — an in-memory table of active transactions behind a
//! mutex, mirrored durably in the metadata store on every state
//! transition. The commit itself is a single durable metadata-store
//! transaction flipping state and visibility together.

pub mod error;
pub mod manager;

pub use error::{TxError, TxResult};
pub use manager::TransactionManager;
