use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use aifs_types::{AssetId, AssetKind, TxId};

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// A declared parent in an ingest request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentSpec {
    pub asset_id: AssetId,
    pub transform_name: Option<String>,
    pub transform_digest: Option<String>,
}

/// Framed messages on the streaming ingest path.
///
/// A put is `PutBegin`, any number of `PutChunk` frames in order, then
/// `PutEnd`. The server answers with a JSON [`PutAssetResponse`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AifsMessage {
    PutBegin {
        namespace: String,
        kind: AssetKind,
        metadata: BTreeMap<String, String>,
        parents: Vec<ParentSpec>,
        embedding: Option<Vec<f32>>,
        tx_id: Option<TxId>,
    },
    PutChunk {
        data: Vec<u8>,
    },
    PutEnd,
    Error {
        code: u32,
        message: String,
    },
}

impl AifsMessage {
    pub fn type_tag(&self) -> u8 {
        match self {
            Self::PutBegin { .. } => 1,
            Self::PutChunk { .. } => 2,
            Self::PutEnd => 3,
            Self::Error { .. } => 255,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::PutBegin { .. } => "PutBegin",
            Self::PutChunk { .. } => "PutChunk",
            Self::PutEnd => "PutEnd",
            Self::Error { .. } => "Error",
        }
    }
}

/// JSON response to a completed put.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PutAssetResponse {
    pub asset_id: String,
    pub uri: String,
    /// Present when the caller owns the transaction and must commit it.
    pub tx_id: Option<String>,
}

/// JSON body of a vector search request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    pub namespace: String,
    pub query: Vec<f32>,
    pub k: usize,
    #[serde(default)]
    pub filter: BTreeMap<String, String>,
}

/// One search hit in a response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub asset_id: String,
    pub score: f32,
}

/// JSON body of a snapshot creation request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotRequest {
    pub namespace: String,
    #[serde(default)]
    pub asset_ids: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// JSON body of a snapshot verification request. Exactly one key source
/// should be set; precedence is pubkey, then trusted key, then namespace.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub trusted_key_id: Option<String>,
    #[serde(default)]
    pub use_namespace_key: bool,
}

/// Machine-readable error body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: crate::status::StatusCode,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default)]
    pub retryable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tags_unique() {
        let msgs = [
            AifsMessage::PutBegin {
                namespace: "ns".into(),
                kind: AssetKind::Blob,
                metadata: BTreeMap::new(),
                parents: vec![],
                embedding: None,
                tx_id: None,
            },
            AifsMessage::PutChunk { data: vec![] },
            AifsMessage::PutEnd,
            AifsMessage::Error {
                code: 0,
                message: String::new(),
            },
        ];
        let mut tags: Vec<u8> = msgs.iter().map(|m| m.type_tag()).collect();
        let len = tags.len();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), len);
    }

    #[test]
    fn search_request_defaults() {
        let req: SearchRequest =
            serde_json::from_str(r#"{"namespace":"ns","query":[1.0],"k":5}"#).unwrap();
        assert!(req.filter.is_empty());
    }

    #[test]
    fn error_body_roundtrip() {
        let body = ErrorBody {
            code: crate::status::StatusCode::NotFound,
            reason: "asset missing".into(),
            detail: None,
            retryable: false,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("detail"));
        let parsed: ErrorBody = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.code, crate::status::StatusCode::NotFound);
    }
}
