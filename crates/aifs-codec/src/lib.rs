//! Payload codecs for the four AIFS asset kinds.
//!
//! Each kind maps to a deterministic byte encoding and a validator:
//!
//! - **blob** — raw bytes, no framing
//! - **tensor** — [`TensorPayload`]: fixed header + contiguous element buffer
//! - **embed** — [`EmbedPayload`]: fixed header + f32 vector
//! - **artifact** — [`ArtifactPayload`]: manifest + ZIP bundle
//!
//! Validators run before storage; malformed encodings never reach the
//! chunk store.

pub mod artifact;
pub mod embed;
pub mod error;
pub mod tensor;

pub use artifact::{ArtifactFile, ArtifactManifest, ArtifactPayload, ArtifactReader};
pub use embed::EmbedPayload;
pub use error::{CodecError, CodecResult};
pub use tensor::{Dtype, TensorPayload};

use aifs_types::AssetKind;

/// Validate encoded bytes against the codec for `kind`.
///
/// Blobs are always valid; structured kinds must decode cleanly.
pub fn validate(kind: AssetKind, data: &[u8]) -> CodecResult<()> {
    match kind {
        AssetKind::Blob => Ok(()),
        AssetKind::Tensor => TensorPayload::decode(data).map(|_| ()),
        AssetKind::Embed => EmbedPayload::decode(data).map(|_| ()),
        AssetKind::Artifact => ArtifactReader::open(data).map(|_| ()),
    }
}
