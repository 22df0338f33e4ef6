use serde::{Deserialize, Serialize};

/// Domain prefix for snapshot signature messages.
const SNAPSHOT_CONTEXT: &str = "AIFS_SNAPSHOT";

/// Build the canonical snapshot signing message.
///
/// Format: `AIFS_SNAPSHOT:{merkle_root_hex}:{timestamp}:{namespace}`,
/// UTF-8 encoded. Timestamp is the RFC 3339 UTC rendering the snapshot
/// record stores; any byte difference in root, timestamp, or namespace
/// invalidates the signature.
pub fn snapshot_message(merkle_root: &[u8; 32], timestamp: &str, namespace: &str) -> Vec<u8> {
    format!(
        "{SNAPSHOT_CONTEXT}:{}:{timestamp}:{namespace}",
        hex::encode(merkle_root)
    )
    .into_bytes()
}

/// Ed25519 signing key (private).
pub struct SigningKey(ed25519_dalek::SigningKey);

/// Ed25519 verifying key (public).
#[derive(Clone, PartialEq, Eq)]
pub struct VerifyingKey(ed25519_dalek::VerifyingKey);

/// Ed25519 signature (64 bytes, deterministic per RFC 8032).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(#[serde(with = "signature_serde")] ed25519_dalek::Signature);

impl SigningKey {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Create from raw 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    /// The corresponding public verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.0.verifying_key())
    }

    /// Sign an arbitrary message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        use ed25519_dalek::Signer;
        Signature(self.0.sign(message))
    }

    /// Sign a snapshot over the canonical message format.
    ///
    /// Returns the signature and its hex rendering (the form persisted in
    /// the metadata store).
    pub fn sign_snapshot(
        &self,
        merkle_root: &[u8; 32],
        timestamp: &str,
        namespace: &str,
    ) -> (Signature, String) {
        let sig = self.sign(&snapshot_message(merkle_root, timestamp, namespace));
        let hex = sig.to_hex();
        (sig, hex)
    }

    /// Raw secret key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl VerifyingKey {
    /// Verify a signature on a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), SignatureError> {
        use ed25519_dalek::Verifier;
        self.0
            .verify(message, &signature.0)
            .map_err(|_| SignatureError::InvalidSignature)
    }

    /// Verify a snapshot signature given in hex, over the canonical message.
    ///
    /// Returns `false` on any format error, tampered field, or wrong key —
    /// verification never panics on malformed input.
    pub fn verify_snapshot(
        &self,
        signature_hex: &str,
        merkle_root: &[u8; 32],
        timestamp: &str,
        namespace: &str,
    ) -> bool {
        let Ok(sig) = Signature::from_hex(signature_hex) else {
            return false;
        };
        self.verify(&snapshot_message(merkle_root, timestamp, namespace), &sig)
            .is_ok()
    }

    /// Raw public key bytes.
    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Hex rendering of the public key.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }

    /// Create from raw 32-byte public key.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, SignatureError> {
        let key = ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self(key))
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(s).map_err(|_| SignatureError::InvalidKey)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| SignatureError::InvalidKey)?;
        Self::from_bytes(arr)
    }
}

impl Signature {
    /// Raw 64-byte signature.
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }

    /// Hex rendering (128 chars).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(s).map_err(|_| SignatureError::InvalidSignature)?;
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| SignatureError::InvalidSignature)?;
        Ok(Self(ed25519_dalek::Signature::from_bytes(&arr)))
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKey(<redacted>)")
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerifyingKey({})", self.to_hex())
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}...)", hex::encode(&self.0.to_bytes()[..8]))
    }
}

/// Errors from signing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid key")]
    InvalidKey,
}

mod signature_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(sig: &ed25519_dalek::Signature, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&sig.to_bytes())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<ed25519_dalek::Signature, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes: Vec<u8> = Vec::deserialize(deserializer)?;
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 64-byte signature"))?;
        Ok(ed25519_dalek::Signature::from_bytes(&arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let sk = SigningKey::generate();
        let vk = sk.verifying_key();
        let sig = sk.sign(b"hello world");
        assert!(vk.verify(b"hello world", &sig).is_ok());
    }

    #[test]
    fn verify_fails_on_wrong_message() {
        let sk = SigningKey::generate();
        let sig = sk.sign(b"correct message");
        assert!(sk.verifying_key().verify(b"wrong message", &sig).is_err());
    }

    #[test]
    fn verify_fails_with_wrong_key() {
        let sk1 = SigningKey::generate();
        let sk2 = SigningKey::generate();
        let sig = sk1.sign(b"message");
        assert!(sk2.verifying_key().verify(b"message", &sig).is_err());
    }

    #[test]
    fn snapshot_message_format() {
        let root = [0xab; 32];
        let msg = snapshot_message(&root, "2024-01-01T00:00:00Z", "prod");
        let expected = format!("AIFS_SNAPSHOT:{}:2024-01-01T00:00:00Z:prod", hex::encode(root));
        assert_eq!(msg, expected.as_bytes());
    }

    #[test]
    fn snapshot_sign_verify_roundtrip() {
        let sk = SigningKey::generate();
        let root = [7u8; 32];
        let (_, sig_hex) = sk.sign_snapshot(&root, "2024-06-01T10:00:00Z", "ns1");
        assert!(sk
            .verifying_key()
            .verify_snapshot(&sig_hex, &root, "2024-06-01T10:00:00Z", "ns1"));
    }

    #[test]
    fn snapshot_signature_is_deterministic() {
        let sk = SigningKey::from_bytes([9u8; 32]);
        let root = [1u8; 32];
        let (_, a) = sk.sign_snapshot(&root, "ts", "ns");
        let (_, b) = sk.sign_snapshot(&root, "ts", "ns");
        assert_eq!(a, b);
    }

    #[test]
    fn tampered_fields_fail_verification() {
        let sk = SigningKey::generate();
        let vk = sk.verifying_key();
        let root = [7u8; 32];
        let (_, sig) = sk.sign_snapshot(&root, "2024-06-01T10:00:00Z", "ns1");

        let mut other_root = root;
        other_root[0] ^= 1;
        assert!(!vk.verify_snapshot(&sig, &other_root, "2024-06-01T10:00:00Z", "ns1"));
        assert!(!vk.verify_snapshot(&sig, &root, "2024-06-01T10:00:01Z", "ns1"));
        assert!(!vk.verify_snapshot(&sig, &root, "2024-06-01T10:00:00Z", "ns2"));
    }

    #[test]
    fn malformed_signature_hex_fails_closed() {
        let sk = SigningKey::generate();
        let vk = sk.verifying_key();
        assert!(!vk.verify_snapshot("zz-not-hex", &[0; 32], "ts", "ns"));
        assert!(!vk.verify_snapshot("abcd", &[0; 32], "ts", "ns"));
    }

    #[test]
    fn key_hex_roundtrip() {
        let sk = SigningKey::generate();
        let vk = sk.verifying_key();
        assert_eq!(VerifyingKey::from_hex(&vk.to_hex()).unwrap(), vk);
    }

    #[test]
    fn from_bytes_roundtrip() {
        let sk = SigningKey::generate();
        let sk2 = SigningKey::from_bytes(*sk.as_bytes());
        assert_eq!(sk.verifying_key(), sk2.verifying_key());
    }

    #[test]
    fn signature_serde_roundtrip() {
        let sig = SigningKey::generate().sign(b"test");
        let json = serde_json::to_string(&sig).unwrap();
        let parsed: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(sig, parsed);
    }

    #[test]
    fn debug_redacts_signing_key() {
        let sk = SigningKey::generate();
        assert!(format!("{sk:?}").contains("redacted"));
    }

    #[test]
    fn signature_is_64_bytes() {
        let sig = SigningKey::generate().sign(b"x");
        assert_eq!(sig.to_bytes().len(), 64);
        assert_eq!(sig.to_hex().len(), 128);
    }
}
