//! Wire protocol for AIFS.
//!
//! Defines the status-code vocabulary, the framed binary messages used
//! for streaming ingest, the JSON request/response bodies, and the
//! endpoint paths the server mounts. Framing follows a
//! `[len(u32 BE)][tag(u8)][bincode payload]` layout so a reader can skip
//! unknown frames without decoding them.

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod message;
pub mod status;

pub use codec::AifsCodec;
pub use endpoint::{endpoints, HealthResponse, IndexNamespaceInfo, IntrospectResponse};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{
    AifsMessage, ErrorBody, ParentSpec, PutAssetResponse, SearchRequest, SearchResult,
    SnapshotRequest, VerifyRequest, MAX_MESSAGE_SIZE, PROTOCOL_VERSION,
};
pub use status::StatusCode;

/// Content-encoding value advertised for compressed transport.
pub const CONTENT_ENCODING_ZSTD: &str = "zstd";
