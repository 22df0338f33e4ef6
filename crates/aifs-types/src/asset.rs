use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Content-addressed identifier for an asset.
///
/// An `AssetId` is the BLAKE3-256 hash of an asset's content: for a
/// single-chunk asset the hash of the bytes themselves, for a multi-chunk
/// asset the hash of the ordered chunk-hash list. Identical content always
/// produces the same `AssetId`, making assets deduplicatable and
/// verifiable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId([u8; 32]);

impl AssetId {
    /// Compute an `AssetId` by hashing raw bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create an `AssetId` from a pre-computed 32-byte hash.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation (64 lowercase chars).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a 64-character lowercase hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        if s.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(TypeError::InvalidHex("uppercase digits".into()));
        }
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", self.short_hex())
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for AssetId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<AssetId> for [u8; 32] {
    fn from(id: AssetId) -> Self {
        id.0
    }
}

/// Identifier for a signed snapshot.
///
/// The first 16 bytes of `BLAKE3(merkle_root || timestamp)`, rendered as 32
/// lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapshotId([u8; 16]);

impl SnapshotId {
    /// Derive a snapshot id from a merkle root and its canonical timestamp.
    pub fn derive(merkle_root: &[u8; 32], timestamp: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(merkle_root);
        hasher.update(timestamp.as_bytes());
        let hash = hasher.finalize();
        let mut arr = [0u8; 16];
        arr.copy_from_slice(&hash.as_bytes()[..16]);
        Self(arr)
    }

    /// Create from raw bytes.
    pub fn from_raw(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// The raw 16-byte id.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Hex-encoded string representation (32 lowercase chars).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 32-character lowercase hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        if s.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(TypeError::InvalidHex("uppercase digits".into()));
        }
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 16 {
            return Err(TypeError::InvalidLength {
                expected: 16,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SnapshotId({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_id_is_deterministic() {
        let data = b"hello world";
        let id1 = AssetId::from_bytes(data);
        let id2 = AssetId::from_bytes(data);
        assert_eq!(id1, id2);
    }

    #[test]
    fn different_data_produces_different_ids() {
        assert_ne!(AssetId::from_bytes(b"hello"), AssetId::from_bytes(b"world"));
    }

    #[test]
    fn hex_roundtrip() {
        let id = AssetId::from_bytes(b"test");
        let parsed = AssetId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn display_is_64_lowercase_hex() {
        let id = AssetId::from_bytes(b"test");
        let s = format!("{id}");
        assert_eq!(s.len(), 64);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn rejects_uppercase_hex() {
        let id = AssetId::from_bytes(b"test");
        let upper = id.to_hex().to_uppercase();
        assert!(AssetId::from_hex(&upper).is_err());
    }

    #[test]
    fn rejects_wrong_length() {
        let err = AssetId::from_hex("abcd").unwrap_err();
        assert!(matches!(err, TypeError::InvalidLength { .. }));
    }

    #[test]
    fn snapshot_id_is_32_hex_chars() {
        let root = [7u8; 32];
        let id = SnapshotId::derive(&root, "2024-01-01T00:00:00Z");
        assert_eq!(id.to_hex().len(), 32);
    }

    #[test]
    fn snapshot_id_depends_on_timestamp() {
        let root = [7u8; 32];
        let a = SnapshotId::derive(&root, "2024-01-01T00:00:00Z");
        let b = SnapshotId::derive(&root, "2024-01-01T00:00:01Z");
        assert_ne!(a, b);
    }

    #[test]
    fn snapshot_id_hex_roundtrip() {
        let id = SnapshotId::derive(&[1u8; 32], "ts");
        assert_eq!(SnapshotId::from_hex(&id.to_hex()).unwrap(), id);
    }

    #[test]
    fn serde_roundtrip() {
        let id = AssetId::from_bytes(b"serde test");
        let json = serde_json::to_string(&id).unwrap();
        let parsed: AssetId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn ordering_is_consistent() {
        let id1 = AssetId::from_hash([0; 32]);
        let id2 = AssetId::from_hash([1; 32]);
        assert!(id1 < id2);
    }
}
