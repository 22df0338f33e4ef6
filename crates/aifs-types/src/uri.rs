use std::fmt;

use crate::asset::{AssetId, SnapshotId};
use crate::error::TypeError;
use crate::kind::AssetKind;

/// Parsed `aifs://<namespace>/<asset_id>[.<kind>]` identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetUri {
    pub namespace: String,
    pub asset_id: AssetId,
    pub kind: Option<AssetKind>,
}

impl AssetUri {
    const SCHEME: &'static str = "aifs://";

    pub fn new(namespace: impl Into<String>, asset_id: AssetId) -> Self {
        Self {
            namespace: namespace.into(),
            asset_id,
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: AssetKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Parse an `aifs://` URI.
    pub fn parse(uri: &str) -> Result<Self, TypeError> {
        let rest = uri
            .strip_prefix(Self::SCHEME)
            .ok_or_else(|| TypeError::InvalidUri(format!("expected aifs:// scheme: {uri}")))?;
        let (namespace, id_part) = rest
            .split_once('/')
            .ok_or_else(|| TypeError::InvalidUri("missing namespace separator".into()))?;
        if namespace.is_empty() {
            return Err(TypeError::InvalidUri("empty namespace".into()));
        }
        let (id_hex, kind) = match id_part.split_once('.') {
            Some((id, kind_str)) => (id, Some(AssetKind::parse(kind_str)?)),
            None => (id_part, None),
        };
        let asset_id = AssetId::from_hex(id_hex)?;
        Ok(Self {
            namespace: namespace.to_string(),
            asset_id,
            kind,
        })
    }
}

impl fmt::Display for AssetUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", Self::SCHEME, self.namespace, self.asset_id)?;
        if let Some(kind) = self.kind {
            write!(f, ".{kind}")?;
        }
        Ok(())
    }
}

/// Parsed `aifs-snap://<namespace>/<snapshot_id>` identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotUri {
    pub namespace: String,
    pub snapshot_id: SnapshotId,
}

impl SnapshotUri {
    const SCHEME: &'static str = "aifs-snap://";

    pub fn new(namespace: impl Into<String>, snapshot_id: SnapshotId) -> Self {
        Self {
            namespace: namespace.into(),
            snapshot_id,
        }
    }

    /// Parse an `aifs-snap://` URI.
    pub fn parse(uri: &str) -> Result<Self, TypeError> {
        let rest = uri
            .strip_prefix(Self::SCHEME)
            .ok_or_else(|| TypeError::InvalidUri(format!("expected aifs-snap:// scheme: {uri}")))?;
        let (namespace, id_hex) = rest
            .split_once('/')
            .ok_or_else(|| TypeError::InvalidUri("missing namespace separator".into()))?;
        if namespace.is_empty() {
            return Err(TypeError::InvalidUri("empty namespace".into()));
        }
        Ok(Self {
            namespace: namespace.to_string(),
            snapshot_id: SnapshotId::from_hex(id_hex)?,
        })
    }
}

impl fmt::Display for SnapshotUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", Self::SCHEME, self.namespace, self.snapshot_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_asset_id() -> AssetId {
        AssetId::from_bytes(b"uri test")
    }

    #[test]
    fn asset_uri_roundtrip() {
        let uri = AssetUri::new("prod", test_asset_id());
        let parsed = AssetUri::parse(&uri.to_string()).unwrap();
        assert_eq!(parsed, uri);
    }

    #[test]
    fn asset_uri_with_kind_roundtrip() {
        let uri = AssetUri::new("prod", test_asset_id()).with_kind(AssetKind::Tensor);
        let rendered = uri.to_string();
        assert!(rendered.ends_with(".tensor"));
        assert_eq!(AssetUri::parse(&rendered).unwrap(), uri);
    }

    #[test]
    fn asset_uri_rejects_wrong_scheme() {
        let err = AssetUri::parse("http://prod/abc").unwrap_err();
        assert!(matches!(err, TypeError::InvalidUri(_)));
    }

    #[test]
    fn asset_uri_rejects_missing_namespace() {
        let bad = format!("aifs://{}", test_asset_id());
        assert!(AssetUri::parse(&bad).is_err());
    }

    #[test]
    fn asset_uri_rejects_bad_hash() {
        assert!(AssetUri::parse("aifs://prod/nothex").is_err());
    }

    #[test]
    fn asset_uri_rejects_unknown_kind() {
        let bad = format!("aifs://prod/{}.parquet", test_asset_id());
        assert!(AssetUri::parse(&bad).is_err());
    }

    #[test]
    fn snapshot_uri_roundtrip() {
        let id = SnapshotId::derive(&[3u8; 32], "2024-01-01T00:00:00Z");
        let uri = SnapshotUri::new("prod", id);
        assert_eq!(SnapshotUri::parse(&uri.to_string()).unwrap(), uri);
    }

    #[test]
    fn snapshot_uri_rejects_asset_scheme() {
        let id = SnapshotId::derive(&[3u8; 32], "ts");
        let bad = format!("aifs://prod/{id}");
        assert!(SnapshotUri::parse(&bad).is_err());
    }
}
