//! Foundation types for AIFS.
//!
//! This crate provides the identifier, kind, and timestamp types used
//! throughout the AIFS engine. Every other AIFS crate depends on
//! `aifs-types`.
//!
//! # Key Types
//!
//! - [`AssetId`] — Content-addressed asset identifier (BLAKE3-256)
//! - [`SnapshotId`] — Truncated BLAKE3 snapshot identifier
//! - [`TxId`] — Transaction identifier (UUID v4)
//! - [`AssetKind`] — Payload kind selecting a codec
//! - [`Timestamp`] — RFC 3339 UTC timestamp with second precision

pub mod asset;
pub mod error;
pub mod kind;
pub mod metric;
pub mod timestamp;
pub mod tx;
pub mod uri;

pub use asset::{AssetId, SnapshotId};
pub use error::TypeError;
pub use kind::AssetKind;
pub use metric::DistanceMetric;
pub use timestamp::Timestamp;
pub use tx::TxId;
pub use uri::{AssetUri, SnapshotUri};
