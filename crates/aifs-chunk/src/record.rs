use serde::{Deserialize, Serialize};

use aifs_types::AssetId;

/// How the plaintext was transformed before encryption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkCodec {
    /// Stored as-is (compression did not shrink the payload).
    None,
    /// zstd-compressed.
    Zstd,
}

impl ChunkCodec {
    /// Single byte bound into the AEAD associated data.
    pub fn as_byte(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Zstd => 1,
        }
    }
}

/// Durable description of one stored chunk.
///
/// Persisted both as a JSON sidecar next to the chunk file and as a row in
/// the metadata store. Everything needed to decrypt and verify the chunk
/// lives here except the ciphertext itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// BLAKE3-256 of the plaintext.
    pub hash: AssetId,
    /// Plaintext length in bytes.
    pub size_plain: u64,
    /// Ciphertext length on disk (nonce and tag excluded).
    pub size_stored: u64,
    /// Pre-encryption transform.
    pub codec: ChunkCodec,
    /// zstd level used (meaningful only when `codec == Zstd`).
    pub compression_level: i32,
    /// KMS key id that wrapped this chunk's DEK.
    pub kms_key_id: String,
    /// Wrapped data encryption key, hex.
    pub wrapped_dek: String,
    /// AES-GCM nonce, hex (12 bytes).
    pub nonce: String,
    /// AES-GCM tag, hex (16 bytes).
    pub aead_tag: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_bytes_are_distinct() {
        assert_ne!(ChunkCodec::None.as_byte(), ChunkCodec::Zstd.as_byte());
    }

    #[test]
    fn record_serde_roundtrip() {
        let record = ChunkRecord {
            hash: AssetId::from_bytes(b"chunk"),
            size_plain: 100,
            size_stored: 64,
            codec: ChunkCodec::Zstd,
            compression_level: 3,
            kms_key_id: "k1".into(),
            wrapped_dek: "aabb".into(),
            nonce: "00".repeat(12),
            aead_tag: "11".repeat(16),
        };
        let json = serde_json::to_string(&record).unwrap();
        let parsed: ChunkRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
