//! Content-addressed chunk storage for AIFS.
//!
//! Chunks are keyed by the BLAKE3-256 of their plaintext, deduplicated,
//! transparently compressed with zstd, and sealed with AES-256-GCM before
//! they touch disk. See [`ChunkStore`] for the store contract and
//! [`FsChunkStore`] for the filesystem backend.

pub mod error;
pub mod fs;
pub mod memory;
pub mod record;
pub mod traits;

pub use error::{ChunkError, ChunkResult};
pub use fs::FsChunkStore;
pub use memory::InMemoryChunkStore;
pub use record::{ChunkCodec, ChunkRecord};
pub use traits::ChunkStore;

/// Default zstd compression level.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 1;
/// Valid zstd compression levels.
pub const COMPRESSION_LEVEL_RANGE: std::ops::RangeInclusive<i32> = 1..=22;
