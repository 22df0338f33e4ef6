//! Metadata plane for AIFS.
//!
//! A single SQLite database is the source of truth for assets, chunk
//! records, lineage edges, snapshots, branches, tags, branch history,
//! transactions, visibility, namespaces, and key registrations. The store
//! is schema-migrated on open, runs in WAL mode with foreign keys on, and
//! serializes writers behind one connection.
//!
//! Visibility is the load-bearing concept: an asset row exists from the
//! moment it is written inside a transaction, but readers only see it once
//! its transaction commits and flips the visibility bit — in the same
//! SQLite transaction that records the commit.

pub mod error;
pub mod records;
pub mod store;

pub use error::{MetaError, MetaResult};
pub use records::{
    AssetFilter, AssetRecord, BranchHistoryRecord, BranchRecord, LineageEdge, NamespaceKeyRecord,
    NamespaceRecord, SnapshotRecord, TagRecord, TrustedKeyRecord, TxRecord, TxState,
};
pub use store::MetaStore;
