use aifs_types::AssetId;

use crate::error::ChunkResult;
use crate::record::ChunkRecord;

/// Content-addressed chunk store.
///
/// All implementations must satisfy these invariants:
/// - Chunks are immutable once written; the hash of the plaintext is the
///   identity, so a second write of the same bytes is a no-op.
/// - Writes are race-safe: concurrent puts of identical content converge
///   on one stored chunk.
/// - `get` re-verifies the plaintext hash after decrypt/decompress and
///   fails loudly on mismatch rather than returning bad bytes.
/// - Reads never take locks; chunk files are write-once.
pub trait ChunkStore: Send + Sync {
    /// Store plaintext, returning the chunk record.
    ///
    /// `level` is the zstd level (1..=22). If the chunk already exists the
    /// existing record is returned unchanged (dedup).
    fn put(&self, plaintext: &[u8], level: i32) -> ChunkResult<ChunkRecord>;

    /// Fetch and verify a chunk's plaintext.
    fn get(&self, hash: &AssetId) -> ChunkResult<Vec<u8>>;

    /// Whether a chunk is present.
    fn exists(&self, hash: &AssetId) -> ChunkResult<bool>;

    /// The stored record for a chunk, if present.
    fn record(&self, hash: &AssetId) -> ChunkResult<Option<ChunkRecord>>;

    /// Remove a chunk from disk. Returns `true` if it existed.
    ///
    /// Intended for admin pruning only; refcounts live in the metadata
    /// store and must reach zero before this is called.
    fn delete(&self, hash: &AssetId) -> ChunkResult<bool>;

    /// Re-wrap the chunk's DEK under the provider's current KMS key.
    ///
    /// Ciphertext is untouched; only the key envelope changes. Returns the
    /// updated record.
    fn rotate_key(&self, hash: &AssetId) -> ChunkResult<ChunkRecord>;
}
