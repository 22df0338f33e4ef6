use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The kind of payload an asset carries.
///
/// Each kind selects a codec: how the bytes are encoded, validated, and
/// (for structured kinds) what header travels with them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Raw bytes, no framing.
    Blob,
    /// N-dimensional typed array: header + contiguous element buffer.
    Tensor,
    /// Fixed-dimension f32 vector with model provenance.
    Embed,
    /// Manifest plus a ZIP-formatted file bundle.
    Artifact,
}

impl AssetKind {
    /// Stable string form used in the metadata store and URIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tensor => "tensor",
            Self::Embed => "embed",
            Self::Artifact => "artifact",
        }
    }

    /// Parse from the stable string form.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        match s {
            "blob" => Ok(Self::Blob),
            "tensor" => Ok(Self::Tensor),
            "embed" => Ok(Self::Embed),
            "artifact" => Ok(Self::Artifact),
            other => Err(TypeError::UnknownKind(other.to_string())),
        }
    }

    /// All kinds, in codec-tag order.
    pub fn all() -> [Self; 4] {
        [Self::Blob, Self::Tensor, Self::Embed, Self::Artifact]
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_roundtrip() {
        for kind in AssetKind::all() {
            assert_eq!(AssetKind::parse(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_rejected() {
        let err = AssetKind::parse("model").unwrap_err();
        assert!(matches!(err, TypeError::UnknownKind(_)));
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(format!("{}", AssetKind::Tensor), "tensor");
    }
}
