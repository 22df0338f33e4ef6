//! In-memory chunk store for testing and ephemeral use.
//!
//! [`InMemoryChunkStore`] runs the same compress/seal pipeline as the
//! filesystem backend but keeps everything in a `HashMap` behind a
//! `RwLock`. Data is lost when the store is dropped.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, RwLock};

use aifs_crypto::{ChunkSealer, KmsProvider, SealedChunk, WrappedKey};
use aifs_types::AssetId;

use crate::error::{ChunkError, ChunkResult};
use crate::record::{ChunkCodec, ChunkRecord};
use crate::traits::ChunkStore;
use crate::COMPRESSION_LEVEL_RANGE;

/// An in-memory implementation of [`ChunkStore`].
pub struct InMemoryChunkStore {
    kms: Arc<dyn KmsProvider>,
    chunks: RwLock<HashMap<AssetId, (ChunkRecord, SealedChunk)>>,
}

impl InMemoryChunkStore {
    pub fn new(kms: Arc<dyn KmsProvider>) -> Self {
        Self {
            kms,
            chunks: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.chunks.read().expect("chunk map poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChunkStore for InMemoryChunkStore {
    fn put(&self, plaintext: &[u8], level: i32) -> ChunkResult<ChunkRecord> {
        if !COMPRESSION_LEVEL_RANGE.contains(&level) {
            return Err(ChunkError::InvalidLevel(level));
        }
        let hash = AssetId::from_bytes(plaintext);

        if let Some((record, _)) = self.chunks.read().expect("chunk map poisoned").get(&hash) {
            return Ok(record.clone());
        }

        let compressed = zstd::stream::encode_all(Cursor::new(plaintext), level)
            .map_err(ChunkError::Io)?;
        let (codec, to_seal) = if compressed.len() >= plaintext.len() {
            (ChunkCodec::None, plaintext.to_vec())
        } else {
            (ChunkCodec::Zstd, compressed)
        };

        let (dek, wrapped) = self.kms.generate_data_key()?;
        let sealed = ChunkSealer::seal(&dek, &hash, codec.as_byte(), &to_seal)
            .map_err(|e| ChunkError::Integrity {
                id: hash,
                reason: e.to_string(),
            })?;

        let record = ChunkRecord {
            hash,
            size_plain: plaintext.len() as u64,
            size_stored: sealed.ciphertext.len() as u64,
            codec,
            compression_level: level,
            kms_key_id: wrapped.key_id.clone(),
            wrapped_dek: hex::encode(&wrapped.wrapped_dek),
            nonce: hex::encode(sealed.nonce),
            aead_tag: hex::encode(sealed.tag),
        };

        // entry() rather than insert() so a concurrent identical put keeps
        // the first record.
        let mut chunks = self.chunks.write().expect("chunk map poisoned");
        let entry = chunks.entry(hash).or_insert((record, sealed));
        Ok(entry.0.clone())
    }

    fn get(&self, hash: &AssetId) -> ChunkResult<Vec<u8>> {
        let (record, sealed) = {
            let chunks = self.chunks.read().expect("chunk map poisoned");
            chunks
                .get(hash)
                .cloned()
                .ok_or(ChunkError::NotFound(*hash))?
        };

        let wrapped = WrappedKey {
            wrapped_dek: hex::decode(&record.wrapped_dek).map_err(|e| ChunkError::Sidecar {
                id: *hash,
                reason: e.to_string(),
            })?,
            key_id: record.kms_key_id.clone(),
        };
        let dek = self.kms.unwrap_data_key(&wrapped)?;

        let opened = ChunkSealer::open(&dek, hash, record.codec.as_byte(), &sealed)
            .map_err(|e| ChunkError::Integrity {
                id: *hash,
                reason: e.to_string(),
            })?;

        let plaintext = match record.codec {
            ChunkCodec::None => opened,
            ChunkCodec::Zstd => {
                zstd::stream::decode_all(Cursor::new(opened)).map_err(ChunkError::Io)?
            }
        };

        let actual = AssetId::from_bytes(&plaintext);
        if actual != *hash {
            return Err(ChunkError::Corruption {
                id: *hash,
                actual: actual.to_hex(),
            });
        }
        Ok(plaintext)
    }

    fn exists(&self, hash: &AssetId) -> ChunkResult<bool> {
        Ok(self.chunks.read().expect("chunk map poisoned").contains_key(hash))
    }

    fn record(&self, hash: &AssetId) -> ChunkResult<Option<ChunkRecord>> {
        Ok(self
            .chunks
            .read()
            .expect("chunk map poisoned")
            .get(hash)
            .map(|(r, _)| r.clone()))
    }

    fn delete(&self, hash: &AssetId) -> ChunkResult<bool> {
        Ok(self
            .chunks
            .write()
            .expect("chunk map poisoned")
            .remove(hash)
            .is_some())
    }

    fn rotate_key(&self, hash: &AssetId) -> ChunkResult<ChunkRecord> {
        let mut chunks = self.chunks.write().expect("chunk map poisoned");
        let (record, _) = chunks.get_mut(hash).ok_or(ChunkError::NotFound(*hash))?;
        let wrapped = WrappedKey {
            wrapped_dek: hex::decode(&record.wrapped_dek).map_err(|e| ChunkError::Sidecar {
                id: *hash,
                reason: e.to_string(),
            })?,
            key_id: record.kms_key_id.clone(),
        };
        let rewrapped = self.kms.rewrap(&wrapped)?;
        record.kms_key_id = rewrapped.key_id.clone();
        record.wrapped_dek = hex::encode(&rewrapped.wrapped_dek);
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aifs_crypto::LocalKms;

    fn store() -> InMemoryChunkStore {
        InMemoryChunkStore::new(Arc::new(LocalKms::generate()))
    }

    #[test]
    fn put_get_roundtrip() {
        let store = store();
        let record = store.put(b"memory chunk", 1).unwrap();
        assert_eq!(store.get(&record.hash).unwrap(), b"memory chunk");
    }

    #[test]
    fn dedup_keeps_single_entry() {
        let store = store();
        store.put(b"dup", 1).unwrap();
        store.put(b"dup", 1).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_chunk_not_found() {
        let store = store();
        let hash = AssetId::from_bytes(b"ghost");
        assert!(matches!(store.get(&hash).unwrap_err(), ChunkError::NotFound(_)));
    }

    #[test]
    fn delete_then_get_fails() {
        let store = store();
        let record = store.put(b"bye", 1).unwrap();
        assert!(store.delete(&record.hash).unwrap());
        assert!(store.get(&record.hash).is_err());
    }

    #[test]
    fn rotate_key_keeps_plaintext() {
        let store = store();
        let record = store.put(b"spin", 1).unwrap();
        let rotated = store.rotate_key(&record.hash).unwrap();
        assert_ne!(rotated.wrapped_dek, record.wrapped_dek);
        assert_eq!(store.get(&record.hash).unwrap(), b"spin");
    }
}
