use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use aifs_crypto::{ChunkSealer, KmsProvider, SealedChunk, WrappedKey};
use aifs_types::AssetId;

use crate::error::{ChunkError, ChunkResult};
use crate::record::{ChunkCodec, ChunkRecord};
use crate::traits::ChunkStore;
use crate::COMPRESSION_LEVEL_RANGE;

/// Filesystem chunk store.
///
/// Layout: `root/<hh>/<full-hash>` where `<hh>` is the first two hex chars
/// of the chunk hash, bounding directory fan-out. Each chunk file holds
/// `nonce(12) || tag(16) || ciphertext`; the key envelope and codec live
/// in a `.meta` JSON sidecar and are mirrored into the metadata store by
/// the asset manager.
///
/// Writes go to a temp file in the target directory and are renamed into
/// place, so concurrent writers of the same content race benignly: the
/// last rename wins and both produce identical bytes.
pub struct FsChunkStore {
    root: PathBuf,
    kms: Arc<dyn KmsProvider>,
}

impl FsChunkStore {
    /// Open (or create) a chunk store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>, kms: Arc<dyn KmsProvider>) -> ChunkResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root, kms })
    }

    fn chunk_path(&self, hash: &AssetId) -> PathBuf {
        let hex = hash.to_hex();
        self.root.join(&hex[..2]).join(hex)
    }

    fn sidecar_path(&self, hash: &AssetId) -> PathBuf {
        let mut path = self.chunk_path(hash).into_os_string();
        path.push(".meta");
        PathBuf::from(path)
    }

    fn read_record(&self, hash: &AssetId) -> ChunkResult<ChunkRecord> {
        let data = match fs::read(self.sidecar_path(hash)) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ChunkError::NotFound(*hash));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&data).map_err(|e| ChunkError::Sidecar {
            id: *hash,
            reason: e.to_string(),
        })
    }

    fn write_record(&self, record: &ChunkRecord) -> ChunkResult<()> {
        let path = self.sidecar_path(&record.hash);
        let tmp = path.with_extension("meta.tmp");
        fs::write(&tmp, serde_json::to_vec(record).expect("record serializes"))?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl ChunkStore for FsChunkStore {
    fn put(&self, plaintext: &[u8], level: i32) -> ChunkResult<ChunkRecord> {
        if !COMPRESSION_LEVEL_RANGE.contains(&level) {
            return Err(ChunkError::InvalidLevel(level));
        }

        let hash = AssetId::from_bytes(plaintext);

        // Dedup: same hash means same content; the first write's key
        // material and codec stand.
        if let Ok(existing) = self.read_record(&hash) {
            debug!(chunk = %hash.short_hex(), "chunk already present, dedup hit");
            return Ok(existing);
        }

        // Compress, keeping plaintext when compression does not help.
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

        let path = self.chunk_path(&hash);
        fs::create_dir_all(path.parent().expect("sharded path has a parent"))?;
        // The nonce is fresh per writer, so concurrent puts of the same
        // content never share a temp file; last rename wins and both
        // renames install a valid chunk.
        let tmp = path.with_extension(format!("tmp-{}", hex::encode(&sealed.nonce[..6])));
        fs::write(&tmp, sealed.to_file_bytes())?;
        fs::rename(&tmp, &path)?;

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
        self.write_record(&record)?;

        debug!(
            chunk = %hash.short_hex(),
            plain = record.size_plain,
            stored = record.size_stored,
            codec = ?record.codec,
            "chunk written"
        );
        Ok(record)
    }

    fn get(&self, hash: &AssetId) -> ChunkResult<Vec<u8>> {
        let record = self.read_record(hash)?;
        let file_bytes = match fs::read(self.chunk_path(hash)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ChunkError::NotFound(*hash));
            }
            Err(e) => return Err(e.into()),
        };

        let sealed = SealedChunk::from_file_bytes(&file_bytes).map_err(|e| {
            ChunkError::Integrity {
                id: *hash,
                reason: e.to_string(),
            }
        })?;

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
            ChunkCodec::Zstd => zstd::stream::decode_all(Cursor::new(opened))
                .map_err(ChunkError::Io)?,
        };

        // Content-addressing check: the decrypted, decompressed bytes must
        // re-hash to the chunk id.
        let actual = AssetId::from_bytes(&plaintext);
        if actual != *hash {
            warn!(chunk = %hash.short_hex(), "chunk failed re-hash after decrypt");
            return Err(ChunkError::Corruption {
                id: *hash,
                actual: actual.to_hex(),
            });
        }
        Ok(plaintext)
    }

    fn exists(&self, hash: &AssetId) -> ChunkResult<bool> {
        Ok(self.chunk_path(hash).exists())
    }

    fn record(&self, hash: &AssetId) -> ChunkResult<Option<ChunkRecord>> {
        match self.read_record(hash) {
            Ok(record) => Ok(Some(record)),
            Err(ChunkError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn delete(&self, hash: &AssetId) -> ChunkResult<bool> {
        let path = self.chunk_path(hash);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        let _ = fs::remove_file(self.sidecar_path(hash));
        // Drop the shard directory if this was its last chunk.
        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir(parent);
        }
        Ok(true)
    }

    fn rotate_key(&self, hash: &AssetId) -> ChunkResult<ChunkRecord> {
        let mut record = self.read_record(hash)?;
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
        self.write_record(&record)?;
        debug!(chunk = %hash.short_hex(), key_id = %record.kms_key_id, "chunk DEK re-wrapped");
        Ok(record)
    }
}

impl std::fmt::Debug for FsChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FsChunkStore({})", self.root.display())
    }
}
