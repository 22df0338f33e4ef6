//! Per-namespace vector index for AIFS.
//!
//! Each namespace owns an independent index over fixed-dimension `f32`
//! vectors; the dimension is fixed by the first insert. Search is an
//! exact best-first scan under the namespace's distance metric — small
//! per-namespace corpora make the exact scan the honest baseline, and the
//! [`VectorIndex`] surface leaves the backend swappable.
//!
//! Visibility is enforced at search time: the caller supplies a predicate
//! (backed by the metadata store) and non-visible assets are filtered out
//! before scoring.

pub mod error;
pub mod index;
pub mod metric;

pub use error::{IndexError, IndexResult};
pub use index::{NamespaceStats, SearchHit, VectorIndex};
pub use metric::score;
