use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

/// A data key wrapped for storage.
///
/// `key_id` names the KMS master key that wrapped it; rotation re-wraps
/// under a new `key_id` without touching chunk ciphertext.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrappedKey {
    pub wrapped_dek: Vec<u8>,
    pub key_id: String,
}

/// Key-management seam: wraps and unwraps data encryption keys.
///
/// The engine only ever sees plaintext DEKs transiently; what persists is
/// the wrapped form plus the wrapping key id. Production deployments
/// substitute an external KMS behind this trait.
pub trait KmsProvider: Send + Sync {
    /// Generate a fresh 256-bit data key and return it with its wrapped form.
    fn generate_data_key(&self) -> Result<([u8; 32], WrappedKey), KmsError>;

    /// Unwrap a previously wrapped data key.
    fn unwrap_data_key(&self, wrapped: &WrappedKey) -> Result<[u8; 32], KmsError>;

    /// Re-wrap a data key under the provider's current master key.
    ///
    /// Used for key rotation: the DEK (and therefore the chunk ciphertext)
    /// is unchanged, only the envelope changes.
    fn rewrap(&self, wrapped: &WrappedKey) -> Result<WrappedKey, KmsError> {
        let dek = self.unwrap_data_key(wrapped)?;
        self.wrap_data_key(&dek)
    }

    /// Wrap an existing data key.
    fn wrap_data_key(&self, dek: &[u8; 32]) -> Result<WrappedKey, KmsError>;

    /// The id of the master key new wraps are made under.
    fn current_key_id(&self) -> String;
}

/// Local KMS provider holding the master key in process memory.
///
/// Wrapped form: `nonce(12) || ciphertext+tag`, AES-256-GCM under the
/// master key. Suitable for single-node deployments and tests.
pub struct LocalKms {
    master_key: [u8; 32],
    key_id: String,
}

impl LocalKms {
    /// Create a provider with an explicit master key.
    pub fn new(master_key: [u8; 32], key_id: impl Into<String>) -> Self {
        Self {
            master_key,
            key_id: key_id.into(),
        }
    }

    /// Create a provider with a random master key and default key id.
    pub fn generate() -> Self {
        let mut master_key = [0u8; 32];
        OsRng.fill_bytes(&mut master_key);
        Self::new(master_key, "aifs-local-key")
    }
}

impl KmsProvider for LocalKms {
    fn generate_data_key(&self) -> Result<([u8; 32], WrappedKey), KmsError> {
        let mut dek = [0u8; 32];
        OsRng.fill_bytes(&mut dek);
        let wrapped = self.wrap_data_key(&dek)?;
        Ok((dek, wrapped))
    }

    fn wrap_data_key(&self, dek: &[u8; 32]) -> Result<WrappedKey, KmsError> {
        let cipher =
            Aes256Gcm::new_from_slice(&self.master_key).map_err(|_| KmsError::InvalidMasterKey)?;
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), dek.as_slice())
            .map_err(|_| KmsError::WrapFailed)?;
        let mut wrapped_dek = Vec::with_capacity(12 + sealed.len());
        wrapped_dek.extend_from_slice(&nonce_bytes);
        wrapped_dek.extend_from_slice(&sealed);
        Ok(WrappedKey {
            wrapped_dek,
            key_id: self.key_id.clone(),
        })
    }

    fn unwrap_data_key(&self, wrapped: &WrappedKey) -> Result<[u8; 32], KmsError> {
        if wrapped.key_id != self.key_id {
            return Err(KmsError::UnknownKeyId(wrapped.key_id.clone()));
        }
        if wrapped.wrapped_dek.len() < 12 {
            return Err(KmsError::MalformedEnvelope);
        }
        let (nonce_bytes, sealed) = wrapped.wrapped_dek.split_at(12);
        let cipher =
            Aes256Gcm::new_from_slice(&self.master_key).map_err(|_| KmsError::InvalidMasterKey)?;
        let dek = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| KmsError::UnwrapFailed)?;
        dek.try_into().map_err(|_| KmsError::MalformedEnvelope)
    }

    fn current_key_id(&self) -> String {
        self.key_id.clone()
    }
}

impl std::fmt::Debug for LocalKms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LocalKms(key_id={}, master=<redacted>)", self.key_id)
    }
}

/// Errors from KMS operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KmsError {
    #[error("invalid master key")]
    InvalidMasterKey,
    #[error("failed to wrap data key")]
    WrapFailed,
    #[error("failed to unwrap data key")]
    UnwrapFailed,
    #[error("unknown kms key id: {0}")]
    UnknownKeyId(String),
    #[error("malformed key envelope")]
    MalformedEnvelope,
}
