use aifs_types::AssetId;

/// BLAKE3 content hasher.
///
/// Asset and chunk identifiers are the plain BLAKE3-256 of the plaintext
/// bytes, with no domain tag: the on-wire contract is that clients can
/// recompute an asset id from nothing but the content.
pub struct ContentHasher;

impl ContentHasher {
    /// Hash raw bytes into an asset/chunk id.
    pub fn hash(data: &[u8]) -> AssetId {
        AssetId::from_hash(*blake3::hash(data).as_bytes())
    }

    /// Raw 32-byte BLAKE3 hash.
    pub fn raw_hash(data: &[u8]) -> [u8; 32] {
        *blake3::hash(data).as_bytes()
    }

    /// Hash an ordered list of chunk ids into a multi-chunk asset id.
    ///
    /// The id is the BLAKE3 of the concatenated raw chunk hashes, in the
    /// order the chunks appear in the asset.
    pub fn hash_chunk_list(chunks: &[AssetId]) -> AssetId {
        let mut hasher = blake3::Hasher::new();
        for chunk in chunks {
            hasher.update(chunk.as_bytes());
        }
        AssetId::from_hash(*hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected id.
    pub fn verify(data: &[u8], expected: &AssetId) -> bool {
        Self::hash(data) == *expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let data = b"hello world";
        assert_eq!(ContentHasher::hash(data), ContentHasher::hash(data));
    }

    #[test]
    fn hash_matches_plain_blake3() {
        // Clients recompute ids with stock blake3; no domain separation.
        let data = b"hello world";
        let id = ContentHasher::hash(data);
        assert_eq!(id.to_hex(), blake3::hash(data).to_hex().to_string());
    }

    #[test]
    fn verify_correct_data() {
        let id = ContentHasher::hash(b"test data");
        assert!(ContentHasher::verify(b"test data", &id));
    }

    #[test]
    fn verify_incorrect_data() {
        let id = ContentHasher::hash(b"original");
        assert!(!ContentHasher::verify(b"tampered", &id));
    }

    #[test]
    fn chunk_list_hash_is_order_sensitive() {
        let a = ContentHasher::hash(b"a");
        let b = ContentHasher::hash(b"b");
        assert_ne!(
            ContentHasher::hash_chunk_list(&[a, b]),
            ContentHasher::hash_chunk_list(&[b, a])
        );
    }

    #[test]
    fn single_chunk_list_differs_from_chunk_hash() {
        // A one-element list hashes the 32-byte id, not the content.
        let a = ContentHasher::hash(b"content");
        assert_ne!(ContentHasher::hash_chunk_list(&[a]), a);
    }
}
