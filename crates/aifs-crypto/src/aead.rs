use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use aifs_types::AssetId;

/// AES-256-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;
/// AES-256-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Result of sealing a chunk: nonce, detached tag, and ciphertext.
///
/// The on-disk chunk file is `nonce || tag || ciphertext`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedChunk {
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl SealedChunk {
    /// Serialize to the on-disk layout.
    pub fn to_file_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_LEN + TAG_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Parse from the on-disk layout.
    pub fn from_file_bytes(data: &[u8]) -> Result<Self, SealError> {
        if data.len() < NONCE_LEN + TAG_LEN {
            return Err(SealError::Malformed {
                len: data.len(),
                min: NONCE_LEN + TAG_LEN,
            });
        }
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&data[..NONCE_LEN]);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&data[NONCE_LEN..NONCE_LEN + TAG_LEN]);
        Ok(Self {
            nonce,
            tag,
            ciphertext: data[NONCE_LEN + TAG_LEN..].to_vec(),
        })
    }
}

/// AES-256-GCM chunk sealer.
///
/// Associated data binds the chunk hash and the codec byte, so a stored
/// ciphertext cannot be replayed under another chunk id or reinterpreted
/// with the opposite codec.
pub struct ChunkSealer;

impl ChunkSealer {
    /// Encrypt `plaintext` under `dek` with a fresh random 96-bit nonce.
    pub fn seal(
        dek: &[u8; 32],
        chunk_hash: &AssetId,
        codec_byte: u8,
        plaintext: &[u8],
    ) -> Result<SealedChunk, SealError> {
        let cipher = Aes256Gcm::new_from_slice(dek).map_err(|_| SealError::InvalidKey)?;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let aad = associated_data(chunk_hash, codec_byte);
        // The aead crate appends the 16-byte tag to the ciphertext; split it
        // off so the tag can be stored in the fixed header position.
        let mut sealed = cipher
            .encrypt(nonce, Payload { msg: plaintext, aad: &aad })
            .map_err(|_| SealError::EncryptFailed)?;
        let tag_start = sealed.len() - TAG_LEN;
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&sealed[tag_start..]);
        sealed.truncate(tag_start);

        Ok(SealedChunk {
            nonce: nonce_bytes,
            tag,
            ciphertext: sealed,
        })
    }

    /// Decrypt a sealed chunk. Fails with [`SealError::TagMismatch`] when
    /// the tag does not authenticate (tampered ciphertext, wrong key, or
    /// wrong associated data).
    pub fn open(
        dek: &[u8; 32],
        chunk_hash: &AssetId,
        codec_byte: u8,
        sealed: &SealedChunk,
    ) -> Result<Vec<u8>, SealError> {
        let cipher = Aes256Gcm::new_from_slice(dek).map_err(|_| SealError::InvalidKey)?;
        let nonce = Nonce::from_slice(&sealed.nonce);
        let aad = associated_data(chunk_hash, codec_byte);

        let mut combined = Vec::with_capacity(sealed.ciphertext.len() + TAG_LEN);
        combined.extend_from_slice(&sealed.ciphertext);
        combined.extend_from_slice(&sealed.tag);

        cipher
            .decrypt(nonce, Payload { msg: &combined, aad: &aad })
            .map_err(|_| SealError::TagMismatch)
    }
}

fn associated_data(chunk_hash: &AssetId, codec_byte: u8) -> Vec<u8> {
    let mut aad = Vec::with_capacity(33);
    aad.extend_from_slice(chunk_hash.as_bytes());
    aad.push(codec_byte);
    aad
}

/// Errors from chunk sealing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SealError {
    #[error("invalid AES-256 key")]
    InvalidKey,
    #[error("encryption failed")]
    EncryptFailed,
    #[error("AEAD tag mismatch")]
    TagMismatch,
    #[error("malformed sealed chunk: {len} bytes, need at least {min}")]
    Malformed { len: usize, min: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dek() -> [u8; 32] {
        [0x42; 32]
    }

    fn hash_of(data: &[u8]) -> AssetId {
        AssetId::from_bytes(data)
    }

    #[test]
    fn seal_open_roundtrip() {
        let data = b"chunk payload";
        let hash = hash_of(data);
        let sealed = ChunkSealer::seal(&dek(), &hash, 0, data).unwrap();
        let opened = ChunkSealer::open(&dek(), &hash, 0, &sealed).unwrap();
        assert_eq!(opened, data);
    }

    #[test]
    fn nonces_are_fresh() {
        let data = b"same payload";
        let hash = hash_of(data);
        let a = ChunkSealer::seal(&dek(), &hash, 0, data).unwrap();
        let b = ChunkSealer::seal(&dek(), &hash, 0, data).unwrap();
        assert_ne!(a.nonce, b.nonce);
    }

    #[test]
    fn wrong_key_fails() {
        let data = b"secret";
        let hash = hash_of(data);
        let sealed = ChunkSealer::seal(&dek(), &hash, 0, data).unwrap();
        let err = ChunkSealer::open(&[0x43; 32], &hash, 0, &sealed).unwrap_err();
        assert_eq!(err, SealError::TagMismatch);
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let data = b"secret";
        let hash = hash_of(data);
        let mut sealed = ChunkSealer::seal(&dek(), &hash, 0, data).unwrap();
        sealed.ciphertext[0] ^= 1;
        assert_eq!(
            ChunkSealer::open(&dek(), &hash, 0, &sealed).unwrap_err(),
            SealError::TagMismatch
        );
    }

    #[test]
    fn wrong_chunk_hash_in_aad_fails() {
        let data = b"secret";
        let sealed = ChunkSealer::seal(&dek(), &hash_of(data), 0, data).unwrap();
        let other = hash_of(b"other chunk");
        assert_eq!(
            ChunkSealer::open(&dek(), &other, 0, &sealed).unwrap_err(),
            SealError::TagMismatch
        );
    }

    #[test]
    fn codec_byte_is_bound() {
        // A ciphertext sealed as zstd cannot be opened as uncompressed.
        let data = b"secret";
        let hash = hash_of(data);
        let sealed = ChunkSealer::seal(&dek(), &hash, 1, data).unwrap();
        assert_eq!(
            ChunkSealer::open(&dek(), &hash, 0, &sealed).unwrap_err(),
            SealError::TagMismatch
        );
    }

    #[test]
    fn file_bytes_roundtrip() {
        let data = b"on disk";
        let hash = hash_of(data);
        let sealed = ChunkSealer::seal(&dek(), &hash, 0, data).unwrap();
        let parsed = SealedChunk::from_file_bytes(&sealed.to_file_bytes()).unwrap();
        assert_eq!(parsed, sealed);
        assert_eq!(ChunkSealer::open(&dek(), &hash, 0, &parsed).unwrap(), data);
    }

    #[test]
    fn truncated_file_rejected() {
        let err = SealedChunk::from_file_bytes(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, SealError::Malformed { .. }));
    }

    #[test]
    fn empty_plaintext_roundtrip() {
        let hash = hash_of(b"");
        let sealed = ChunkSealer::seal(&dek(), &hash, 0, b"").unwrap();
        assert_eq!(ChunkSealer::open(&dek(), &hash, 0, &sealed).unwrap(), b"");
    }
}
