//! Cryptographic primitives for AIFS.
//!
//! - [`ContentHasher`] — BLAKE3 content addressing
//! - [`SigningKey`]/[`VerifyingKey`] — Ed25519 snapshot signatures
//! - [`MerkleTree`]/[`MerkleProof`] — snapshot inclusion proofs
//! - [`ChunkSealer`] — AES-256-GCM chunk encryption
//! - [`KmsProvider`] — data-key wrap/unwrap seam with a local default

pub mod aead;
pub mod hasher;
pub mod kms;
pub mod merkle;
pub mod signer;

pub use aead::{ChunkSealer, SealError, SealedChunk};
pub use hasher::ContentHasher;
pub use kms::{KmsError, KmsProvider, LocalKms, WrappedKey};
pub use merkle::{MerkleProof, MerkleTree, Side};
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
