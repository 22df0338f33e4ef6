use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use aifs_auth::Method;
use aifs_engine::{
    AifsEngine, AssetView, EngineError, EventFilter, EventKind, Mode, ParentRef, PutOptions,
    VerifyWith,
};
use aifs_meta::AssetFilter;
use aifs_protocol::{
    AifsCodec, AifsMessage, HealthResponse, IndexNamespaceInfo, IntrospectResponse,
    PutAssetResponse, SearchRequest, SearchResult, SnapshotRequest, VerifyRequest,
};
use aifs_types::{AssetId, AssetKind, AssetUri, SnapshotId};

use crate::error::{ServerError, ServerResult};
use crate::state::SharedState;

/// Run a blocking engine call off the async worker threads.
async fn blocking<T, F>(engine: Arc<AifsEngine>, f: F) -> ServerResult<T>
where
    T: Send + 'static,
    F: FnOnce(&AifsEngine) -> Result<T, EngineError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&engine))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
        .map_err(Into::into)
}

// ---------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------

/// Client-streaming ingest: the body is a sequence of framed messages —
/// `PutBegin`, ordered `PutChunk`s, `PutEnd`.
pub async fn put_asset(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Json<PutAssetResponse>> {
    let frames = AifsCodec::decode_stream(&body)?;
    let mut iter = frames.into_iter();

    let Some(AifsMessage::PutBegin {
        namespace,
        kind,
        metadata,
        parents,
        embedding,
        tx_id,
    }) = iter.next()
    else {
        return Err(ServerError::BadRequest("stream must start with PutBegin".into()));
    };

    state.authorize(&headers, Method::Put, &namespace)?;

    let mut data = Vec::new();
    let mut ended = false;
    for frame in iter {
        match frame {
            AifsMessage::PutChunk { data: piece } => {
                if ended {
                    return Err(ServerError::BadRequest("chunk after PutEnd".into()));
                }
                data.extend_from_slice(&piece);
            }
            AifsMessage::PutEnd => ended = true,
            other => {
                return Err(ServerError::BadRequest(format!(
                    "unexpected frame {}",
                    other.type_name()
                )));
            }
        }
    }
    if !ended {
        return Err(ServerError::BadRequest("stream missing PutEnd".into()));
    }

    let opts = PutOptions {
        namespace: namespace.clone(),
        metadata,
        parents: parents
            .into_iter()
            .map(|p| ParentRef {
                asset_id: p.asset_id,
                transform_name: p.transform_name,
                transform_digest: p.transform_digest,
            })
            .collect(),
        embedding,
        metric: None,
        tx_id,
    };

    let asset_id = blocking(state.engine.clone(), move |engine| {
        engine.put_asset(&data, kind, opts)
    })
    .await?;

    debug!(asset = %asset_id.short_hex(), namespace = %namespace, "asset ingested");
    Ok(Json(PutAssetResponse {
        asset_id: asset_id.to_hex(),
        uri: AssetUri::new(namespace, asset_id).with_kind(kind).to_string(),
        tx_id: tx_id.map(|t| t.to_string()),
    }))
}

#[derive(Deserialize)]
pub struct GetAssetQuery {
    pub namespace: String,
    #[serde(default)]
    pub include_data: bool,
}

/// Asset metadata response.
#[derive(Serialize, Deserialize)]
pub struct AssetResponse {
    pub asset_id: String,
    pub uri: String,
    pub kind: String,
    pub size: u64,
    pub namespace: String,
    pub metadata: BTreeMap<String, String>,
    pub created_at: String,
    pub parents: Vec<LineageEntry>,
    pub children: Vec<LineageEntry>,
}

#[derive(Serialize, Deserialize)]
pub struct LineageEntry {
    pub asset_id: String,
    pub transform_name: Option<String>,
    pub transform_digest: Option<String>,
}

fn asset_response(view: &AssetView) -> AssetResponse {
    let record = &view.record;
    AssetResponse {
        asset_id: record.asset_id.to_hex(),
        uri: AssetUri::new(record.namespace.clone(), record.asset_id)
            .with_kind(record.kind)
            .to_string(),
        kind: record.kind.to_string(),
        size: record.size,
        namespace: record.namespace.clone(),
        metadata: record.metadata.clone(),
        created_at: record.created_at.to_rfc3339(),
        parents: view
            .parents
            .iter()
            .map(|e| LineageEntry {
                asset_id: e.parent_id.to_hex(),
                transform_name: e.transform_name.clone(),
                transform_digest: e.transform_digest.clone(),
            })
            .collect(),
        children: view
            .children
            .iter()
            .map(|e| LineageEntry {
                asset_id: e.child_id.to_hex(),
                transform_name: e.transform_name.clone(),
                transform_digest: e.transform_digest.clone(),
            })
            .collect(),
    }
}

/// Retrieval. With `include_data` the payload bytes stream back as the
/// body; without, the response is the JSON metadata view.
pub async fn get_asset(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<GetAssetQuery>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    state.authorize(&headers, Method::Get, &query.namespace)?;
    let asset_id = parse_asset_id(&id)?;
    let include = query.include_data;

    let view = blocking(state.engine.clone(), move |engine| {
        engine.get_asset(&asset_id, include)
    })
    .await?;

    // The namespace is part of the asset's address; a mismatch is
    // indistinguishable from absence.
    if view.record.namespace != query.namespace {
        return Err(ServerError::Engine(EngineError::NotFound {
            what: "asset",
            id,
        }));
    }

    if let Some(bytes) = view.bytes {
        let kind = view.record.kind.to_string();
        Ok((
            [
                (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                (header::HeaderName::from_static("x-aifs-kind"), kind),
            ],
            bytes,
        )
            .into_response())
    } else {
        Ok(Json(asset_response(&view)).into_response())
    }
}

#[derive(Deserialize)]
pub struct NamespaceQuery {
    pub namespace: String,
}

pub async fn delete_asset(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<NamespaceQuery>,
    headers: HeaderMap,
) -> ServerResult<Json<serde_json::Value>> {
    state.authorize(&headers, Method::Admin, &query.namespace)?;
    let asset_id = parse_asset_id(&id)?;
    blocking(state.engine.clone(), move |engine| {
        engine.delete_asset(&asset_id)
    })
    .await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}

#[derive(Deserialize)]
pub struct ListAssetsQuery {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct ListAssetsResponse {
    pub assets: Vec<AssetResponse>,
    /// Cursor for the next page, absent when this page was short.
    pub next_cursor: Option<String>,
}

pub async fn list_assets(
    State(state): State<SharedState>,
    Query(query): Query<ListAssetsQuery>,
    headers: HeaderMap,
) -> ServerResult<Json<ListAssetsResponse>> {
    let namespace = query.namespace.clone().unwrap_or_default();
    state.authorize(&headers, Method::Get, &namespace)?;

    let kind = query
        .kind
        .as_deref()
        .map(AssetKind::parse)
        .transpose()
        .map_err(|e| ServerError::BadRequest(e.to_string()))?;
    let limit = query.limit.unwrap_or(100);
    let offset: u64 = query
        .cursor
        .as_deref()
        .and_then(|c| c.parse().ok())
        .unwrap_or(0);

    let filter = AssetFilter {
        namespace: query.namespace,
        kind,
        limit,
        cursor: query.cursor,
    };
    let records = blocking(state.engine.clone(), move |engine| {
        engine.list_assets(&filter)
    })
    .await?;

    let next_cursor = if records.len() as u32 == limit {
        Some((offset + records.len() as u64).to_string())
    } else {
        None
    };
    let assets = records
        .iter()
        .map(|record| {
            asset_response(&AssetView {
                record: record.clone(),
                parents: vec![],
                children: vec![],
                bytes: None,
            })
        })
        .collect();
    Ok(Json(ListAssetsResponse { assets, next_cursor }))
}

// ---------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------

pub async fn search(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<SearchRequest>,
) -> ServerResult<Json<Vec<SearchResult>>> {
    state.authorize(&headers, Method::Search, &request.namespace)?;
    let hits = blocking(state.engine.clone(), move |engine| {
        engine.vector_search(&request.namespace, &request.query, request.k, &request.filter)
    })
    .await?;
    Ok(Json(
        hits.into_iter()
            .map(|hit| SearchResult {
                asset_id: hit.asset_id.to_hex(),
                score: hit.score,
            })
            .collect(),
    ))
}

// ---------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub snapshot_id: String,
    pub namespace: String,
    pub merkle_root: String,
    pub timestamp: String,
    pub signature: String,
    pub signer_pubkey: String,
    pub metadata: BTreeMap<String, String>,
    pub asset_ids: Vec<String>,
}

fn snapshot_response(record: &aifs_meta::SnapshotRecord) -> SnapshotResponse {
    SnapshotResponse {
        snapshot_id: record.snapshot_id.to_hex(),
        namespace: record.namespace.clone(),
        merkle_root: hex::encode(record.merkle_root),
        timestamp: record.timestamp.to_rfc3339(),
        signature: record.signature_hex.clone(),
        signer_pubkey: record.signer_pubkey_hex.clone(),
        metadata: record.metadata.clone(),
        asset_ids: record.asset_ids.iter().map(|id| id.to_hex()).collect(),
    }
}

pub async fn create_snapshot(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<SnapshotRequest>,
) -> ServerResult<Json<SnapshotResponse>> {
    state.authorize(&headers, Method::Snapshot, &request.namespace)?;
    let asset_ids = request
        .asset_ids
        .map(|ids| ids.iter().map(|id| parse_asset_id(id)).collect::<ServerResult<Vec<_>>>())
        .transpose()?;
    let record = blocking(state.engine.clone(), move |engine| {
        engine.create_snapshot(&request.namespace, asset_ids, request.metadata)
    })
    .await?;
    Ok(Json(snapshot_response(&record)))
}

pub async fn get_snapshot(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ServerResult<Json<SnapshotResponse>> {
    let snapshot_id = parse_snapshot_id(&id)?;
    let record = blocking(state.engine.clone(), move |engine| {
        engine.get_snapshot(&snapshot_id)
    })
    .await?;
    state.authorize(&headers, Method::Get, &record.namespace)?;
    Ok(Json(snapshot_response(&record)))
}

#[derive(Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

pub async fn verify_snapshot(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<VerifyRequest>,
) -> ServerResult<Json<VerifyResponse>> {
    let snapshot_id = parse_snapshot_id(&id)?;
    let record = blocking(state.engine.clone(), move |engine| {
        engine.get_snapshot(&snapshot_id)
    })
    .await?;
    state.authorize(&headers, Method::Get, &record.namespace)?;

    let valid = blocking(state.engine.clone(), move |engine| {
        let with = if let Some(ref key) = request.public_key {
            VerifyWith::PublicKey(key)
        } else if let Some(ref key_id) = request.trusted_key_id {
            VerifyWith::TrustedKey(key_id)
        } else {
            VerifyWith::NamespaceKey
        };
        engine.verify_snapshot(&snapshot_id, with)
    })
    .await?;
    Ok(Json(VerifyResponse { valid }))
}

#[derive(Serialize, Deserialize)]
pub struct ProofResponse {
    pub asset_id: String,
    pub leaf_count: u64,
    /// `(sibling_hash_hex, "left"|"right")` pairs from leaf to root.
    pub path: Vec<(String, String)>,
}

pub async fn snapshot_proof(
    State(state): State<SharedState>,
    Path((id, asset)): Path<(String, String)>,
    headers: HeaderMap,
) -> ServerResult<Json<ProofResponse>> {
    let snapshot_id = parse_snapshot_id(&id)?;
    let asset_id = parse_asset_id(&asset)?;
    let record = blocking(state.engine.clone(), move |engine| {
        engine.get_snapshot(&snapshot_id)
    })
    .await?;
    state.authorize(&headers, Method::Get, &record.namespace)?;

    let proof = blocking(state.engine.clone(), move |engine| {
        engine.snapshot_proof(&snapshot_id, &asset_id)
    })
    .await?;
    Ok(Json(ProofResponse {
        asset_id: proof.asset_id.to_hex(),
        leaf_count: proof.leaf_count,
        path: proof
            .path
            .iter()
            .map(|(hash, side)| {
                let side = match side {
                    aifs_crypto::Side::Left => "left".to_string(),
                    aifs_crypto::Side::Right => "right".to_string(),
                };
                (hex::encode(hash), side)
            })
            .collect(),
    }))
}

// ---------------------------------------------------------------------
// Branches & tags
// ---------------------------------------------------------------------

#[derive(Deserialize)]
pub struct RefRequest {
    pub snapshot_id: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize)]
pub struct BranchResponse {
    pub name: String,
    pub namespace: String,
    pub snapshot_id: String,
    pub created_at: String,
    pub updated_at: String,
}

pub async fn put_branch(
    State(state): State<SharedState>,
    Path((namespace, name)): Path<(String, String)>,
    headers: HeaderMap,
    Json(request): Json<RefRequest>,
) -> ServerResult<Json<BranchResponse>> {
    state.authorize(&headers, Method::Branch, &namespace)?;
    let snapshot_id = parse_snapshot_id(&request.snapshot_id)?;
    let record = blocking(state.engine.clone(), move |engine| {
        engine.create_branch(&namespace, &name, &snapshot_id, request.metadata)
    })
    .await?;
    Ok(Json(branch_response(&record)))
}

fn branch_response(record: &aifs_meta::BranchRecord) -> BranchResponse {
    BranchResponse {
        name: record.name.clone(),
        namespace: record.namespace.clone(),
        snapshot_id: record.snapshot_id.to_hex(),
        created_at: record.created_at.to_rfc3339(),
        updated_at: record.updated_at.to_rfc3339(),
    }
}

pub async fn get_branch(
    State(state): State<SharedState>,
    Path((namespace, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> ServerResult<Json<BranchResponse>> {
    state.authorize(&headers, Method::Get, &namespace)?;
    let record = blocking(state.engine.clone(), move |engine| {
        engine.get_branch(&namespace, &name)
    })
    .await?;
    Ok(Json(branch_response(&record)))
}

pub async fn list_branches(
    State(state): State<SharedState>,
    Path(namespace): Path<String>,
    headers: HeaderMap,
) -> ServerResult<Json<Vec<BranchResponse>>> {
    state.authorize(&headers, Method::Get, &namespace)?;
    let records = blocking(state.engine.clone(), move |engine| {
        engine.list_branches(&namespace, 1000)
    })
    .await?;
    Ok(Json(records.iter().map(branch_response).collect()))
}

pub async fn delete_branch(
    State(state): State<SharedState>,
    Path((namespace, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> ServerResult<Json<serde_json::Value>> {
    state.authorize(&headers, Method::Branch, &namespace)?;
    let deleted = name.clone();
    blocking(state.engine.clone(), move |engine| {
        engine.delete_branch(&namespace, &name)
    })
    .await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

#[derive(Serialize, Deserialize)]
pub struct BranchHistoryEntry {
    pub old_snapshot_id: Option<String>,
    pub new_snapshot_id: String,
    pub at: String,
}

pub async fn branch_history(
    State(state): State<SharedState>,
    Path((namespace, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> ServerResult<Json<Vec<BranchHistoryEntry>>> {
    state.authorize(&headers, Method::Get, &namespace)?;
    let records = blocking(state.engine.clone(), move |engine| {
        engine.get_branch_history(&namespace, &name, 1000)
    })
    .await?;
    Ok(Json(
        records
            .iter()
            .map(|entry| BranchHistoryEntry {
                old_snapshot_id: entry.old_snapshot_id.map(|s| s.to_hex()),
                new_snapshot_id: entry.new_snapshot_id.to_hex(),
                at: entry.at.to_rfc3339(),
            })
            .collect(),
    ))
}

#[derive(Serialize, Deserialize)]
pub struct TagResponse {
    pub name: String,
    pub namespace: String,
    pub snapshot_id: String,
    pub created_at: String,
}

pub async fn put_tag(
    State(state): State<SharedState>,
    Path((namespace, name)): Path<(String, String)>,
    headers: HeaderMap,
    Json(request): Json<RefRequest>,
) -> ServerResult<Json<TagResponse>> {
    state.authorize(&headers, Method::Tag, &namespace)?;
    let snapshot_id = parse_snapshot_id(&request.snapshot_id)?;
    let record = blocking(state.engine.clone(), move |engine| {
        engine.create_tag(&namespace, &name, &snapshot_id, request.metadata)
    })
    .await?;
    Ok(Json(tag_response(&record)))
}

fn tag_response(record: &aifs_meta::TagRecord) -> TagResponse {
    TagResponse {
        name: record.name.clone(),
        namespace: record.namespace.clone(),
        snapshot_id: record.snapshot_id.to_hex(),
        created_at: record.created_at.to_rfc3339(),
    }
}

pub async fn get_tag(
    State(state): State<SharedState>,
    Path((namespace, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> ServerResult<Json<TagResponse>> {
    state.authorize(&headers, Method::Get, &namespace)?;
    let record = blocking(state.engine.clone(), move |engine| {
        engine.get_tag(&namespace, &name)
    })
    .await?;
    Ok(Json(tag_response(&record)))
}

pub async fn list_tags(
    State(state): State<SharedState>,
    Path(namespace): Path<String>,
    headers: HeaderMap,
) -> ServerResult<Json<Vec<TagResponse>>> {
    state.authorize(&headers, Method::Get, &namespace)?;
    let records = blocking(state.engine.clone(), move |engine| {
        engine.list_tags(&namespace, 1000)
    })
    .await?;
    Ok(Json(records.iter().map(tag_response).collect()))
}

// ---------------------------------------------------------------------
// Key registry
// ---------------------------------------------------------------------

#[derive(Deserialize)]
pub struct NamespaceKeyRequest {
    pub namespace: String,
    pub public_key: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Register a namespace verification key. Re-registration only succeeds
/// when the token carries the `admin` caveat.
pub async fn register_namespace_key(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<NamespaceKeyRequest>,
) -> ServerResult<Json<serde_json::Value>> {
    let token = state.authorize(&headers, Method::Snapshot, &request.namespace)?;
    let overwrite = aifs_auth::Authorizer::grants_admin(&token);
    blocking(state.engine.clone(), move |engine| {
        engine.register_namespace_key(
            &request.namespace,
            &request.public_key,
            request.metadata,
            overwrite,
        )
    })
    .await?;
    Ok(Json(serde_json::json!({ "registered": true })))
}

#[derive(Deserialize)]
pub struct TrustedKeyRequest {
    pub key_id: String,
    pub public_key: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

pub async fn pin_trusted_key(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<TrustedKeyRequest>,
) -> ServerResult<Json<serde_json::Value>> {
    state.authorize(&headers, Method::Admin, request.namespace.as_deref().unwrap_or(""))?;
    blocking(state.engine.clone(), move |engine| {
        engine.pin_trusted_key(
            &request.key_id,
            &request.public_key,
            request.namespace,
            request.metadata,
        )
    })
    .await?;
    Ok(Json(serde_json::json!({ "pinned": true })))
}

// ---------------------------------------------------------------------
// Namespaces, events, health, introspection
// ---------------------------------------------------------------------

pub async fn list_namespaces(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> ServerResult<Json<Vec<String>>> {
    state.authorize(&headers, Method::Get, "")?;
    let records = blocking(state.engine.clone(), move |engine| {
        engine.list_namespaces()
    })
    .await?;
    Ok(Json(records.into_iter().map(|ns| ns.name).collect()))
}

#[derive(Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub namespace: Option<String>,
    /// Comma-separated event kind filter.
    #[serde(default)]
    pub kinds: Option<String>,
}

/// Server-push event stream (SSE).
pub async fn events(
    State(state): State<SharedState>,
    Query(query): Query<EventsQuery>,
    headers: HeaderMap,
) -> ServerResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    state.authorize(&headers, Method::Get, query.namespace.as_deref().unwrap_or(""))?;

    let kinds = query.kinds.as_deref().map(parse_event_kinds).transpose()?;
    let rx = state.engine.subscribe(EventFilter {
        namespace: query.namespace,
        kinds,
    });

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let Ok(sse_event) = Event::default()
                        .event(event.kind.to_string())
                        .json_data(&event)
                    else {
                        continue;
                    };
                    return Some((Ok::<_, Infallible>(sse_event), rx));
                }
                // A slow consumer that lagged keeps going from the oldest
                // retained event.
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn parse_event_kinds(raw: &str) -> ServerResult<Vec<EventKind>> {
    raw.split(',')
        .map(|k| match k.trim() {
            "asset_committed" => Ok(EventKind::AssetCommitted),
            "asset_deleted" => Ok(EventKind::AssetDeleted),
            "snapshot_created" => Ok(EventKind::SnapshotCreated),
            "branch_updated" => Ok(EventKind::BranchUpdated),
            "branch_deleted" => Ok(EventKind::BranchDeleted),
            "tag_created" => Ok(EventKind::TagCreated),
            other => Err(ServerError::BadRequest(format!("unknown event kind: {other}"))),
        })
        .collect()
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

pub async fn introspect(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> ServerResult<Json<IntrospectResponse>> {
    if state.mode != Mode::Development {
        return Err(ServerError::IntrospectionDisabled);
    }
    state.authorize(&headers, Method::Admin, "")?;
    let public_key = state.engine.public_key_hex();
    let stats = blocking(state.engine.clone(), move |engine| engine.stats()).await?;
    Ok(Json(IntrospectResponse {
        asset_count: stats.asset_count,
        chunk_count: stats.chunk_count,
        snapshot_count: stats.snapshot_count,
        namespaces: stats
            .index
            .iter()
            .map(|ns| IndexNamespaceInfo {
                namespace: ns.namespace.clone(),
                dimension: ns.dimension,
                vector_count: ns.vector_count,
            })
            .collect(),
        uptime_secs: stats.uptime_secs,
        public_key,
    }))
}

// ---------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------

fn parse_asset_id(raw: &str) -> ServerResult<AssetId> {
    AssetId::from_hex(raw).map_err(|e| ServerError::BadRequest(e.to_string()))
}

fn parse_snapshot_id(raw: &str) -> ServerResult<SnapshotId> {
    SnapshotId::from_hex(raw).map_err(|e| ServerError::BadRequest(e.to_string()))
}
