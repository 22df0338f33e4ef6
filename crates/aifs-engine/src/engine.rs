use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use aifs_chunk::{ChunkRecord, ChunkStore, FsChunkStore, InMemoryChunkStore};
use aifs_codec::EmbedPayload;
use aifs_crypto::{ContentHasher, LocalKms, MerkleProof, MerkleTree, SigningKey, VerifyingKey};
use aifs_index::{NamespaceStats, SearchHit, VectorIndex};
use aifs_meta::{
    AssetFilter, AssetRecord, BranchHistoryRecord, BranchRecord, LineageEdge, MetaStore,
    NamespaceKeyRecord, NamespaceRecord, SnapshotRecord, TagRecord, TrustedKeyRecord, TxState,
};
use aifs_tx::TransactionManager;
use aifs_types::{AssetId, AssetKind, DistanceMetric, SnapshotId, Timestamp, TxId};

use crate::config::{EngineConfig, Mode};
use crate::error::{EngineError, EngineResult};
use crate::events::{EngineEvent, EventBus, EventFilter, EventKind};

/// Chunk boundary for structured payloads.
pub const CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Options for [`AifsEngine::put_asset`].
#[derive(Clone, Debug, Default)]
pub struct PutOptions {
    pub namespace: String,
    pub metadata: BTreeMap<String, String>,
    /// Parent assets with transform provenance.
    pub parents: Vec<ParentRef>,
    /// Embedding for the vector index. For `embed` assets this defaults
    /// to the payload's own vector.
    pub embedding: Option<Vec<f32>>,
    /// Metric for a namespace's first insert.
    pub metric: Option<DistanceMetric>,
    /// Caller-owned transaction; a single-asset transaction is created
    /// and committed when absent.
    pub tx_id: Option<TxId>,
}

/// A declared parent with its transform.
#[derive(Clone, Debug)]
pub struct ParentRef {
    pub asset_id: AssetId,
    pub transform_name: Option<String>,
    pub transform_digest: Option<String>,
}

/// A retrieved asset.
#[derive(Clone, Debug)]
pub struct AssetView {
    pub record: AssetRecord,
    pub parents: Vec<LineageEdge>,
    pub children: Vec<LineageEdge>,
    /// Reassembled payload when `include_bytes` was requested.
    pub bytes: Option<Vec<u8>>,
}

/// Key source for snapshot verification.
#[derive(Clone, Copy, Debug)]
pub enum VerifyWith<'a> {
    /// A caller-supplied public key, hex.
    PublicKey(&'a str),
    /// The key registered for the snapshot's namespace.
    NamespaceKey,
    /// A pinned trusted key by id.
    TrustedKey(&'a str),
}

/// The AIFS engine: one instance owns every component.
pub struct AifsEngine {
    chunks: Arc<dyn ChunkStore>,
    meta: Arc<MetaStore>,
    tx: TransactionManager,
    index: VectorIndex,
    signing: SigningKey,
    events: EventBus,
    config: EngineConfig,
    started_at: Instant,
}

impl AifsEngine {
    /// Open a disk-backed engine under `config.storage_dir`.
    pub fn open(config: EngineConfig) -> EngineResult<Self> {
        let kms = Arc::new(match config.kms_master_key {
            Some(key) => LocalKms::new(key, "aifs-local-key"),
            None => LocalKms::generate(),
        });
        let chunks = Arc::new(
            FsChunkStore::open(config.storage_dir.join("chunks"), kms)
                .map_err(EngineError::from)?,
        );
        let meta = Arc::new(MetaStore::open(config.storage_dir.join("metadata.db"))?);
        let index =
            VectorIndex::open(config.storage_dir.join("index")).map_err(EngineError::from)?;
        info!(dir = %config.storage_dir.display(), "engine opened");
        Ok(Self::assemble(chunks, meta, index, config))
    }

    /// Fully in-memory engine for tests and ephemeral runs.
    pub fn in_memory() -> EngineResult<Self> {
        let kms = Arc::new(LocalKms::generate());
        let chunks = Arc::new(InMemoryChunkStore::new(kms));
        let meta = Arc::new(MetaStore::open_in_memory()?);
        let index = VectorIndex::in_memory();
        Ok(Self::assemble(chunks, meta, index, EngineConfig::default()))
    }

    fn assemble(
        chunks: Arc<dyn ChunkStore>,
        meta: Arc<MetaStore>,
        index: VectorIndex,
        config: EngineConfig,
    ) -> Self {
        let signing = match config.signing_key {
            Some(seed) => SigningKey::from_bytes(seed),
            None => SigningKey::generate(),
        };
        Self {
            chunks,
            meta: meta.clone(),
            tx: TransactionManager::new(meta),
            index,
            signing,
            events: EventBus::default(),
            config,
            started_at: Instant::now(),
        }
    }

    /// The engine's snapshot-verification public key, hex.
    pub fn public_key_hex(&self) -> String {
        self.signing.verifying_key().to_hex()
    }

    // -----------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------

    pub fn begin_transaction(&self) -> EngineResult<TxId> {
        Ok(self.tx.begin()?)
    }

    /// Commit a transaction, emitting an event per newly visible asset.
    pub fn commit_transaction(&self, tx_id: &TxId) -> EngineResult<()> {
        let assets = self.meta.tx_assets(tx_id)?;
        self.tx.commit(tx_id)?;
        let now = Timestamp::now();
        for asset in assets {
            if let Some(record) = self.meta.get_asset(&asset)? {
                self.events.publish(EngineEvent {
                    kind: EventKind::AssetCommitted,
                    namespace: record.namespace,
                    subject: asset.to_hex(),
                    at: now,
                });
            }
        }
        Ok(())
    }

    /// Roll back a transaction, releasing provisional index entries.
    pub fn rollback_transaction(&self, tx_id: &TxId) -> EngineResult<()> {
        let assets = self.meta.tx_assets(tx_id)?;
        // Capture namespaces before the rows disappear.
        let namespaced: Vec<(AssetId, String)> = assets
            .iter()
            .filter_map(|a| {
                self.meta
                    .get_asset(a)
                    .ok()
                    .flatten()
                    .map(|r| (*a, r.namespace))
            })
            .collect();
        self.tx.rollback(tx_id)?;
        for (asset, namespace) in namespaced {
            self.index.delete(&namespace, &asset);
        }
        Ok(())
    }

    pub fn transaction_state(&self, tx_id: &TxId) -> EngineResult<TxState> {
        Ok(self.tx.state(tx_id)?)
    }

    /// Prune terminal transactions older than `max_age_secs`.
    pub fn cleanup_transactions(&self, max_age_secs: i64) -> EngineResult<usize> {
        let cutoff = Timestamp::from_epoch_secs(Timestamp::now().epoch_secs() - max_age_secs);
        Ok(self.meta.cleanup_transactions(cutoff)?)
    }

    // -----------------------------------------------------------------
    // Assets
    // -----------------------------------------------------------------

    /// Store an asset. See the module docs for the ingest pipeline.
    pub fn put_asset(
        &self,
        data: &[u8],
        kind: AssetKind,
        opts: PutOptions,
    ) -> EngineResult<AssetId> {
        if opts.namespace.is_empty() {
            return Err(EngineError::InvalidArgument("namespace is required".into()));
        }
        aifs_codec::validate(kind, data)?;

        let asset_id = Self::asset_id_for(kind, data);

        // Content addressing makes re-puts idempotent: the asset row, its
        // chunks, and its visibility state already exist.
        if self.meta.get_asset(&asset_id)?.is_some() {
            debug!(asset = %asset_id.short_hex(), "asset already present");
            return Ok(asset_id);
        }

        let (tx_id, auto) = match opts.tx_id {
            Some(id) => {
                if !self.tx.is_pending(&id) {
                    return Err(EngineError::FailedPrecondition(format!(
                        "transaction {id} is not pending"
                    )));
                }
                (id, false)
            }
            None => (self.tx.begin()?, true),
        };

        match self.put_asset_in_tx(data, kind, asset_id, &opts, tx_id) {
            Ok(()) => {
                if auto {
                    self.commit_transaction(&tx_id)?;
                }
                Ok(asset_id)
            }
            Err(e) => {
                if auto {
                    if let Err(rb) = self.rollback_transaction(&tx_id) {
                        warn!(tx = %tx_id, error = %rb, "rollback after failed put also failed");
                    }
                }
                Err(e)
            }
        }
    }

    fn put_asset_in_tx(
        &self,
        data: &[u8],
        kind: AssetKind,
        asset_id: AssetId,
        opts: &PutOptions,
        tx_id: TxId,
    ) -> EngineResult<()> {
        let chunk_records = self.write_chunks(kind, data)?;

        let record = AssetRecord {
            asset_id,
            kind,
            size: data.len() as u64,
            namespace: opts.namespace.clone(),
            metadata: opts.metadata.clone(),
            created_at: Timestamp::now(),
            tx_id,
        };
        self.meta.ensure_namespace(&opts.namespace, record.created_at)?;
        self.meta.insert_asset(&record, &chunk_records)?;
        self.tx.add_asset(&tx_id, asset_id)?;

        if !opts.parents.is_empty() {
            let edges: Vec<LineageEdge> = opts
                .parents
                .iter()
                .map(|p| LineageEdge {
                    child_id: asset_id,
                    parent_id: p.asset_id,
                    transform_name: p.transform_name.clone(),
                    transform_digest: p.transform_digest.clone(),
                })
                .collect();
            self.meta.add_lineage_edges(&edges, record.created_at)?;
            for parent in &opts.parents {
                self.tx.add_dependency(&tx_id, parent.asset_id)?;
            }
        }

        // Provisional index entry: present, but invisible to search until
        // the transaction commits.
        let embedding = match (&opts.embedding, kind) {
            (Some(vector), _) => Some((vector.clone(), opts.metric.unwrap_or(DistanceMetric::Cosine))),
            (None, AssetKind::Embed) => {
                let payload = EmbedPayload::decode(data)?;
                Some((payload.vector, payload.distance_metric))
            }
            _ => None,
        };
        if let Some((vector, metric)) = embedding {
            self.index
                .add(&opts.namespace, asset_id, vector, metric)?;
        }
        Ok(())
    }

    fn asset_id_for(kind: AssetKind, data: &[u8]) -> AssetId {
        match kind {
            AssetKind::Blob => ContentHasher::hash(data),
            _ => {
                let hashes: Vec<AssetId> =
                    data.chunks(CHUNK_SIZE).map(ContentHasher::hash).collect();
                ContentHasher::hash_chunk_list(&hashes)
            }
        }
    }

    fn write_chunks(&self, kind: AssetKind, data: &[u8]) -> EngineResult<Vec<ChunkRecord>> {
        let level = self.config.compression_level;
        match kind {
            AssetKind::Blob => Ok(vec![self.chunks.put(data, level)?]),
            _ => data
                .chunks(CHUNK_SIZE)
                .map(|piece| self.chunks.put(piece, level).map_err(Into::into))
                .collect(),
        }
    }

    /// Retrieve an asset. Non-visible assets are reported as not found.
    pub fn get_asset(&self, asset_id: &AssetId, include_bytes: bool) -> EngineResult<AssetView> {
        let record = self
            .meta
            .get_asset(asset_id)?
            .filter(|_| self.meta.is_visible(asset_id).unwrap_or(false))
            .ok_or_else(|| EngineError::NotFound {
                what: "asset",
                id: asset_id.to_hex(),
            })?;

        let bytes = if include_bytes {
            let chunk_ids = self.meta.asset_chunks(asset_id)?;
            let mut data = Vec::with_capacity(record.size as usize);
            for chunk_id in &chunk_ids {
                data.extend_from_slice(&self.chunks.get(chunk_id)?);
            }
            // Validators re-check on read; failures here mean storage
            // corruption, not caller error.
            aifs_codec::validate(record.kind, &data)
                .map_err(|e| EngineError::Integrity(e.to_string()))?;
            Some(data)
        } else {
            None
        };

        Ok(AssetView {
            parents: self.meta.get_parents(asset_id)?,
            children: self.meta.get_children(asset_id)?,
            record,
            bytes,
        })
    }

    /// Delete an asset: metadata rows go now, chunk bytes stay until an
    /// admin prune collects zero-refcount chunks.
    pub fn delete_asset(&self, asset_id: &AssetId) -> EngineResult<()> {
        let record = self
            .meta
            .get_asset(asset_id)?
            .ok_or_else(|| EngineError::NotFound {
                what: "asset",
                id: asset_id.to_hex(),
            })?;
        self.meta.delete_asset(asset_id)?;
        self.index.delete(&record.namespace, asset_id);
        self.events.publish(EngineEvent {
            kind: EventKind::AssetDeleted,
            namespace: record.namespace,
            subject: asset_id.to_hex(),
            at: Timestamp::now(),
        });
        Ok(())
    }

    /// List visible assets.
    pub fn list_assets(&self, filter: &AssetFilter) -> EngineResult<Vec<AssetRecord>> {
        Ok(self.meta.list_assets(filter)?)
    }

    /// Remove chunks whose refcount reached zero. Returns how many were
    /// collected.
    pub fn prune_chunks(&self) -> EngineResult<usize> {
        let dead = self.meta.zero_ref_chunks()?;
        let mut pruned = 0;
        for hash in dead {
            self.chunks.delete(&hash)?;
            self.meta.delete_chunk_row(&hash)?;
            pruned += 1;
        }
        if pruned > 0 {
            info!(pruned, "chunks pruned");
        }
        Ok(pruned)
    }

    /// Re-wrap one chunk's DEK under the current KMS key.
    pub fn rotate_chunk_key(&self, chunk_hash: &AssetId) -> EngineResult<ChunkRecord> {
        let record = self.chunks.rotate_key(chunk_hash)?;
        self.meta.update_chunk_key(&record)?;
        Ok(record)
    }

    // -----------------------------------------------------------------
    // Vector search
    // -----------------------------------------------------------------

    /// k-NN over a namespace. Only visible assets that match every
    /// equality constraint in `filter` are scored.
    pub fn vector_search(
        &self,
        namespace: &str,
        query: &[f32],
        k: usize,
        filter: &BTreeMap<String, String>,
    ) -> EngineResult<Vec<SearchHit>> {
        let admit = |asset_id: &AssetId| -> bool {
            if !self.meta.is_visible(asset_id).unwrap_or(false) {
                return false;
            }
            if filter.is_empty() {
                return true;
            }
            match self.meta.get_asset(asset_id) {
                Ok(Some(record)) => filter
                    .iter()
                    .all(|(key, value)| record.metadata.get(key) == Some(value)),
                _ => false,
            }
        };
        Ok(self.index.search(namespace, query, k, &admit)?)
    }

    // -----------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------

    /// Create and sign a snapshot over `asset_ids`, defaulting to every
    /// visible asset in the namespace.
    pub fn create_snapshot(
        &self,
        namespace: &str,
        asset_ids: Option<Vec<AssetId>>,
        mut metadata: BTreeMap<String, String>,
    ) -> EngineResult<SnapshotRecord> {
        if namespace.is_empty() {
            return Err(EngineError::InvalidArgument("namespace is required".into()));
        }

        // Registered-key divergence requires explicit opt-in.
        if let Some(registered) = self.meta.get_namespace_key(namespace)? {
            if registered.public_key_hex != self.public_key_hex()
                && !self.config.allow_foreign_namespace_key
            {
                return Err(EngineError::FailedPrecondition(format!(
                    "namespace {namespace} pins a different verification key"
                )));
            }
        }

        let mut members = match asset_ids {
            Some(ids) => {
                for id in &ids {
                    if !self.meta.is_visible(id)? {
                        return Err(EngineError::FailedPrecondition(format!(
                            "asset {id} is not visible"
                        )));
                    }
                }
                ids
            }
            None => self.meta.visible_assets(namespace)?,
        };
        members.sort();
        members.dedup();

        let tree = MerkleTree::from_asset_ids(members.clone());
        let timestamp = Timestamp::now();
        let ts_str = timestamp.to_rfc3339();
        let root = tree.root();
        let (_, signature_hex) = self.signing.sign_snapshot(&root, &ts_str, namespace);

        metadata.insert("leaf_count".into(), tree.leaf_count().to_string());
        if members.is_empty() {
            metadata.insert("empty".into(), "true".into());
        }

        let record = SnapshotRecord {
            snapshot_id: SnapshotId::derive(&root, &ts_str),
            namespace: namespace.to_string(),
            merkle_root: root,
            timestamp,
            signature_hex,
            signer_pubkey_hex: self.public_key_hex(),
            metadata,
            asset_ids: members,
        };
        self.meta.ensure_namespace(namespace, timestamp)?;
        self.meta.create_snapshot(&record)?;
        self.events.publish(EngineEvent {
            kind: EventKind::SnapshotCreated,
            namespace: namespace.to_string(),
            subject: record.snapshot_id.to_hex(),
            at: timestamp,
        });
        debug!(snapshot = %record.snapshot_id, leaves = record.asset_ids.len(), "snapshot created");
        Ok(record)
    }

    pub fn get_snapshot(&self, snapshot_id: &SnapshotId) -> EngineResult<SnapshotRecord> {
        self.meta
            .get_snapshot(snapshot_id)?
            .ok_or_else(|| EngineError::NotFound {
                what: "snapshot",
                id: snapshot_id.to_hex(),
            })
    }

    /// Verify a snapshot signature against one of the three key sources.
    pub fn verify_snapshot(
        &self,
        snapshot_id: &SnapshotId,
        with: VerifyWith<'_>,
    ) -> EngineResult<bool> {
        let snapshot = self.get_snapshot(snapshot_id)?;
        let key_hex = match with {
            VerifyWith::PublicKey(hex) => hex.to_string(),
            VerifyWith::NamespaceKey => match self.meta.get_namespace_key(&snapshot.namespace)? {
                Some(record) => record.public_key_hex,
                None => return Ok(false),
            },
            VerifyWith::TrustedKey(key_id) => match self.meta.get_trusted_key(key_id)? {
                Some(record) => record.public_key_hex,
                None => return Ok(false),
            },
        };
        let Ok(key) = VerifyingKey::from_hex(&key_hex) else {
            return Ok(false);
        };
        Ok(key.verify_snapshot(
            &snapshot.signature_hex,
            &snapshot.merkle_root,
            &snapshot.timestamp.to_rfc3339(),
            &snapshot.namespace,
        ))
    }

    /// Inclusion proof for one member of a snapshot.
    pub fn snapshot_proof(
        &self,
        snapshot_id: &SnapshotId,
        asset_id: &AssetId,
    ) -> EngineResult<MerkleProof> {
        let snapshot = self.get_snapshot(snapshot_id)?;
        let tree = MerkleTree::from_asset_ids(snapshot.asset_ids);
        tree.proof_for(asset_id).ok_or_else(|| EngineError::NotFound {
            what: "snapshot member",
            id: asset_id.to_hex(),
        })
    }

    pub fn list_snapshots(&self, namespace: &str, limit: u32) -> EngineResult<Vec<SnapshotId>> {
        Ok(self.meta.list_snapshots(namespace, limit)?)
    }

    // -----------------------------------------------------------------
    // Branches & tags
    // -----------------------------------------------------------------

    /// Create or move a branch. The target snapshot must exist in the
    /// namespace and carry a valid signature; the pointer update and the
    /// history append are atomic.
    pub fn create_branch(
        &self,
        namespace: &str,
        name: &str,
        snapshot_id: &SnapshotId,
        metadata: BTreeMap<String, String>,
    ) -> EngineResult<BranchRecord> {
        validate_ref_name(name)?;
        self.check_snapshot_for_ref(namespace, snapshot_id)?;

        let now = Timestamp::now();
        self.meta
            .upsert_branch(namespace, name, snapshot_id, now, &metadata)?;
        self.events.publish(EngineEvent {
            kind: EventKind::BranchUpdated,
            namespace: namespace.to_string(),
            subject: name.to_string(),
            at: now,
        });
        self.meta
            .get_branch(namespace, name)?
            .ok_or_else(|| EngineError::Internal("branch vanished after upsert".into()))
    }

    pub fn get_branch(&self, namespace: &str, name: &str) -> EngineResult<BranchRecord> {
        self.meta
            .get_branch(namespace, name)?
            .ok_or_else(|| EngineError::NotFound {
                what: "branch",
                id: format!("{namespace}/{name}"),
            })
    }

    pub fn list_branches(&self, namespace: &str, limit: u32) -> EngineResult<Vec<BranchRecord>> {
        Ok(self.meta.list_branches(namespace, limit)?)
    }

    /// Remove a branch pointer; its history is preserved.
    pub fn delete_branch(&self, namespace: &str, name: &str) -> EngineResult<()> {
        if !self.meta.delete_branch(namespace, name)? {
            return Err(EngineError::NotFound {
                what: "branch",
                id: format!("{namespace}/{name}"),
            });
        }
        self.events.publish(EngineEvent {
            kind: EventKind::BranchDeleted,
            namespace: namespace.to_string(),
            subject: name.to_string(),
            at: Timestamp::now(),
        });
        Ok(())
    }

    pub fn get_branch_history(
        &self,
        namespace: &str,
        name: &str,
        limit: u32,
    ) -> EngineResult<Vec<BranchHistoryRecord>> {
        Ok(self.meta.branch_history(namespace, name, limit)?)
    }

    /// Create an immutable tag.
    pub fn create_tag(
        &self,
        namespace: &str,
        name: &str,
        snapshot_id: &SnapshotId,
        metadata: BTreeMap<String, String>,
    ) -> EngineResult<TagRecord> {
        validate_ref_name(name)?;
        self.check_snapshot_for_ref(namespace, snapshot_id)?;

        let record = TagRecord {
            name: name.to_string(),
            namespace: namespace.to_string(),
            snapshot_id: *snapshot_id,
            created_at: Timestamp::now(),
            metadata,
        };
        self.meta.create_tag(&record)?;
        self.events.publish(EngineEvent {
            kind: EventKind::TagCreated,
            namespace: namespace.to_string(),
            subject: name.to_string(),
            at: record.created_at,
        });
        Ok(record)
    }

    pub fn get_tag(&self, namespace: &str, name: &str) -> EngineResult<TagRecord> {
        self.meta
            .get_tag(namespace, name)?
            .ok_or_else(|| EngineError::NotFound {
                what: "tag",
                id: format!("{namespace}/{name}"),
            })
    }

    pub fn list_tags(&self, namespace: &str, limit: u32) -> EngineResult<Vec<TagRecord>> {
        Ok(self.meta.list_tags(namespace, limit)?)
    }

    fn check_snapshot_for_ref(
        &self,
        namespace: &str,
        snapshot_id: &SnapshotId,
    ) -> EngineResult<()> {
        let snapshot = self.get_snapshot(snapshot_id)?;
        if snapshot.namespace != namespace {
            return Err(EngineError::FailedPrecondition(format!(
                "snapshot {snapshot_id} belongs to namespace {}",
                snapshot.namespace
            )));
        }
        let Ok(key) = VerifyingKey::from_hex(&snapshot.signer_pubkey_hex) else {
            return Err(EngineError::Integrity("snapshot signer key malformed".into()));
        };
        if !key.verify_snapshot(
            &snapshot.signature_hex,
            &snapshot.merkle_root,
            &snapshot.timestamp.to_rfc3339(),
            &snapshot.namespace,
        ) {
            return Err(EngineError::Integrity(format!(
                "snapshot {snapshot_id} signature does not verify"
            )));
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Namespaces & keys
    // -----------------------------------------------------------------

    /// Ensure a namespace exists. Namespaces also come into being on
    /// first ingest; this makes the row explicit.
    pub fn create_namespace(&self, name: &str) -> EngineResult<()> {
        if name.is_empty() {
            return Err(EngineError::InvalidArgument("namespace is required".into()));
        }
        Ok(self.meta.ensure_namespace(name, Timestamp::now())?)
    }

    pub fn list_namespaces(&self) -> EngineResult<Vec<NamespaceRecord>> {
        Ok(self.meta.list_namespaces()?)
    }

    /// Register a verification key for a namespace. Re-registration
    /// requires `overwrite` (gated on an admin caveat by the server).
    pub fn register_namespace_key(
        &self,
        namespace: &str,
        public_key_hex: &str,
        metadata: BTreeMap<String, String>,
        overwrite: bool,
    ) -> EngineResult<()> {
        VerifyingKey::from_hex(public_key_hex)
            .map_err(|_| EngineError::InvalidArgument("malformed public key".into()))?;
        let record = NamespaceKeyRecord {
            namespace: namespace.to_string(),
            public_key_hex: public_key_hex.to_string(),
            created_at: Timestamp::now(),
            metadata,
        };
        Ok(self.meta.register_namespace_key(&record, overwrite)?)
    }

    /// Register the engine's own key for a namespace.
    pub fn register_own_namespace_key(&self, namespace: &str) -> EngineResult<()> {
        self.register_namespace_key(namespace, &self.public_key_hex(), BTreeMap::new(), false)
    }

    pub fn pin_trusted_key(
        &self,
        key_id: &str,
        public_key_hex: &str,
        namespace: Option<String>,
        metadata: BTreeMap<String, String>,
    ) -> EngineResult<()> {
        VerifyingKey::from_hex(public_key_hex)
            .map_err(|_| EngineError::InvalidArgument("malformed public key".into()))?;
        let record = TrustedKeyRecord {
            key_id: key_id.to_string(),
            public_key_hex: public_key_hex.to_string(),
            namespace,
            created_at: Timestamp::now(),
            metadata,
        };
        Ok(self.meta.pin_trusted_key(&record)?)
    }

    pub fn list_namespace_keys(&self) -> EngineResult<Vec<NamespaceKeyRecord>> {
        Ok(self.meta.list_namespace_keys()?)
    }

    pub fn list_trusted_keys(&self) -> EngineResult<Vec<TrustedKeyRecord>> {
        Ok(self.meta.list_trusted_keys()?)
    }

    // -----------------------------------------------------------------
    // Events & introspection
    // -----------------------------------------------------------------

    /// Subscribe to engine events.
    pub fn subscribe(&self, filter: EventFilter) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe(filter)
    }

    /// Component stats for the introspection surface.
    pub fn stats(&self) -> EngineResult<EngineStats> {
        let (asset_count, chunk_count, snapshot_count) = self.meta.counts()?;
        Ok(EngineStats {
            asset_count,
            chunk_count,
            snapshot_count,
            index: self.index.stats(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            mode: self.config.mode,
        })
    }

    /// Persist in-memory index state. Called on shutdown.
    pub fn flush(&self) -> EngineResult<()> {
        self.index.flush()?;
        Ok(())
    }
}

/// Introspection snapshot of engine internals.
#[derive(Clone, Debug)]
pub struct EngineStats {
    pub asset_count: u64,
    pub chunk_count: u64,
    pub snapshot_count: u64,
    pub index: Vec<NamespaceStats>,
    pub uptime_secs: u64,
    pub mode: Mode,
}

impl std::fmt::Debug for AifsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AifsEngine(dir={})", self.config.storage_dir.display())
    }
}

/// Branch and tag names: printable ASCII, no whitespace, no traversal.
fn validate_ref_name(name: &str) -> EngineResult<()> {
    let ok = !name.is_empty()
        && name.len() <= 255
        && !name.contains("..")
        && !name.starts_with('/')
        && !name.ends_with('/')
        && name
            .chars()
            .all(|c| c.is_ascii_graphic() && c != '\\');
    if ok {
        Ok(())
    } else {
        Err(EngineError::InvalidArgument(format!(
            "invalid ref name: {name:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aifs_codec::{Dtype, TensorPayload};

    fn engine() -> AifsEngine {
        AifsEngine::in_memory().unwrap()
    }

    fn put_blob(engine: &AifsEngine, data: &[u8]) -> AssetId {
        engine
            .put_asset(
                data,
                AssetKind::Blob,
                PutOptions {
                    namespace: "ns".into(),
                    ..Default::default()
                },
            )
            .unwrap()
    }

    // ---- content addressing ----

    #[test]
    fn blob_asset_id_is_plain_blake3() {
        let engine = engine();
        let id = put_blob(&engine, b"hello world");
        assert_eq!(id.to_hex(), blake3::hash(b"hello world").to_hex().to_string());
    }

    #[test]
    fn put_get_roundtrip() {
        let engine = engine();
        let id = put_blob(&engine, b"hello world");
        let view = engine.get_asset(&id, true).unwrap();
        assert_eq!(view.bytes.unwrap(), b"hello world");
        assert_eq!(view.record.kind, AssetKind::Blob);
    }

    #[test]
    fn put_is_idempotent() {
        let engine = engine();
        let id1 = put_blob(&engine, b"same bytes");
        let id2 = put_blob(&engine, b"same bytes");
        assert_eq!(id1, id2);
        let stats = engine.stats().unwrap();
        assert_eq!(stats.asset_count, 1);
        assert_eq!(stats.chunk_count, 1);
    }

    #[test]
    fn structured_kind_uses_chunk_list_id() {
        let engine = engine();
        let tensor = TensorPayload::new(Dtype::F32, vec![2], vec![0u8; 8]).unwrap();
        let encoded = tensor.encode().unwrap();
        let id = engine
            .put_asset(
                &encoded,
                AssetKind::Tensor,
                PutOptions {
                    namespace: "ns".into(),
                    ..Default::default()
                },
            )
            .unwrap();
        let chunk_hash = ContentHasher::hash(&encoded);
        assert_eq!(id, ContentHasher::hash_chunk_list(&[chunk_hash]));
        assert_ne!(id, chunk_hash);
        assert_eq!(engine.get_asset(&id, true).unwrap().bytes.unwrap(), encoded);
    }

    #[test]
    fn invalid_payload_rejected_before_storage() {
        let engine = engine();
        let err = engine
            .put_asset(
                b"not a tensor",
                AssetKind::Tensor,
                PutOptions {
                    namespace: "ns".into(),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
        assert_eq!(engine.stats().unwrap().asset_count, 0);
    }

    #[test]
    fn missing_namespace_rejected() {
        let engine = engine();
        let err = engine
            .put_asset(b"x", AssetKind::Blob, PutOptions::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    // ---- strong causality ----

    #[test]
    fn child_commit_blocked_until_parent_visible() {
        let engine = engine();

        let parent_tx = engine.begin_transaction().unwrap();
        let parent = engine
            .put_asset(
                b"parent",
                AssetKind::Blob,
                PutOptions {
                    namespace: "ns".into(),
                    tx_id: Some(parent_tx),
                    ..Default::default()
                },
            )
            .unwrap();

        let child_tx = engine.begin_transaction().unwrap();
        let child = engine
            .put_asset(
                b"child",
                AssetKind::Blob,
                PutOptions {
                    namespace: "ns".into(),
                    tx_id: Some(child_tx),
                    parents: vec![ParentRef {
                        asset_id: parent,
                        transform_name: Some("train".into()),
                        transform_digest: None,
                    }],
                    ..Default::default()
                },
            )
            .unwrap();

        // Parent not yet committed: child commit fails, child stays dark.
        let err = engine.commit_transaction(&child_tx).unwrap_err();
        assert!(matches!(err, EngineError::FailedPrecondition(_)));
        assert!(engine.get_asset(&child, false).is_err());

        engine.commit_transaction(&parent_tx).unwrap();
        engine.rollback_transaction(&child_tx).unwrap();

        // Re-ingest the child now that the parent is visible.
        let child_tx = engine.begin_transaction().unwrap();
        let child = engine
            .put_asset(
                b"child",
                AssetKind::Blob,
                PutOptions {
                    namespace: "ns".into(),
                    tx_id: Some(child_tx),
                    parents: vec![ParentRef {
                        asset_id: parent,
                        transform_name: Some("train".into()),
                        transform_digest: None,
                    }],
                    ..Default::default()
                },
            )
            .unwrap();
        engine.commit_transaction(&child_tx).unwrap();
        assert!(engine.get_asset(&child, false).is_ok());

        let view = engine.get_asset(&child, false).unwrap();
        assert_eq!(view.parents.len(), 1);
        assert_eq!(view.parents[0].parent_id, parent);
    }

    #[test]
    fn uncommitted_asset_is_invisible() {
        let engine = engine();
        let tx = engine.begin_transaction().unwrap();
        let id = engine
            .put_asset(
                b"dark",
                AssetKind::Blob,
                PutOptions {
                    namespace: "ns".into(),
                    tx_id: Some(tx),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(engine.get_asset(&id, false).is_err());
        assert!(engine.list_assets(&AssetFilter::default()).unwrap().is_empty());

        engine.commit_transaction(&tx).unwrap();
        assert!(engine.get_asset(&id, false).is_ok());
    }

    #[test]
    fn rolled_back_asset_never_appears() {
        let engine = engine();
        let tx = engine.begin_transaction().unwrap();
        let id = engine
            .put_asset(
                b"doomed",
                AssetKind::Blob,
                PutOptions {
                    namespace: "ns".into(),
                    tx_id: Some(tx),
                    embedding: Some(vec![1.0, 0.0]),
                    ..Default::default()
                },
            )
            .unwrap();
        engine.rollback_transaction(&tx).unwrap();

        assert!(engine.get_asset(&id, false).is_err());
        // Provisional index entry was released too.
        let hits = engine
            .vector_search("ns", &[1.0, 0.0], 10, &BTreeMap::new())
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn lineage_cycle_fails_put() {
        let engine = engine();
        let a = put_blob(&engine, b"a");
        // b depends on a, then a cannot also become b's child.
        let b = engine
            .put_asset(
                b"b",
                AssetKind::Blob,
                PutOptions {
                    namespace: "ns".into(),
                    parents: vec![ParentRef {
                        asset_id: a,
                        transform_name: None,
                        transform_digest: None,
                    }],
                    ..Default::default()
                },
            )
            .unwrap();
        // Simulating a cycle requires the same content to reappear as a
        // would-be ancestor; content addressing makes the re-put a no-op,
        // so exercise the meta layer's rejection through a fresh asset
        // whose parent chain loops.
        let err = engine
            .put_asset(
                b"c",
                AssetKind::Blob,
                PutOptions {
                    namespace: "ns".into(),
                    parents: vec![
                        ParentRef {
                            asset_id: b,
                            transform_name: None,
                            transform_digest: None,
                        },
                    ],
                    ..Default::default()
                },
            )
            .and_then(|c| {
                // a ← b ← c exists; closing a → c must fail at the store.
                engine
                    .meta
                    .add_lineage_edges(
                        &[LineageEdge {
                            child_id: a,
                            parent_id: c,
                            transform_name: None,
                            transform_digest: None,
                        }],
                        Timestamp::now(),
                    )
                    .map_err(Into::into)
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::FailedPrecondition(_)));
    }

    // ---- delete & prune ----

    #[test]
    fn delete_then_prune_collects_chunks() {
        let engine = engine();
        let id = put_blob(&engine, b"short lived");
        engine.delete_asset(&id).unwrap();
        assert!(engine.get_asset(&id, false).is_err());
        assert_eq!(engine.prune_chunks().unwrap(), 1);
        assert_eq!(engine.stats().unwrap().chunk_count, 0);
    }

    #[test]
    fn delete_unknown_asset_not_found() {
        let engine = engine();
        assert!(matches!(
            engine.delete_asset(&AssetId::from_bytes(b"ghost")).unwrap_err(),
            EngineError::NotFound { .. }
        ));
    }

    // ---- vector search ----

    #[test]
    fn search_returns_only_visible_assets() {
        let engine = engine();
        let visible = engine
            .put_asset(
                b"visible",
                AssetKind::Blob,
                PutOptions {
                    namespace: "ns".into(),
                    embedding: Some(vec![1.0, 0.0]),
                    ..Default::default()
                },
            )
            .unwrap();

        let tx = engine.begin_transaction().unwrap();
        engine
            .put_asset(
                b"pending",
                AssetKind::Blob,
                PutOptions {
                    namespace: "ns".into(),
                    embedding: Some(vec![1.0, 0.1]),
                    tx_id: Some(tx),
                    ..Default::default()
                },
            )
            .unwrap();

        let hits = engine
            .vector_search("ns", &[1.0, 0.0], 10, &BTreeMap::new())
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].asset_id, visible);
    }

    #[test]
    fn search_filter_is_equality_on_metadata() {
        let engine = engine();
        let mut meta = BTreeMap::new();
        meta.insert("split".into(), "train".into());
        let train = engine
            .put_asset(
                b"train data",
                AssetKind::Blob,
                PutOptions {
                    namespace: "ns".into(),
                    metadata: meta,
                    embedding: Some(vec![1.0, 0.0]),
                    ..Default::default()
                },
            )
            .unwrap();
        engine
            .put_asset(
                b"test data",
                AssetKind::Blob,
                PutOptions {
                    namespace: "ns".into(),
                    embedding: Some(vec![1.0, 0.0]),
                    ..Default::default()
                },
            )
            .unwrap();

        let mut filter = BTreeMap::new();
        filter.insert("split".to_string(), "train".to_string());
        let hits = engine.vector_search("ns", &[1.0, 0.0], 10, &filter).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].asset_id, train);
    }

    #[test]
    fn embed_payload_indexes_itself() {
        let engine = engine();
        let payload = EmbedPayload::new("model", vec![0.6, 0.8], DistanceMetric::Cosine)
            .unwrap()
            .encode()
            .unwrap();
        let id = engine
            .put_asset(
                &payload,
                AssetKind::Embed,
                PutOptions {
                    namespace: "ns".into(),
                    ..Default::default()
                },
            )
            .unwrap();
        let hits = engine
            .vector_search("ns", &[0.6, 0.8], 1, &BTreeMap::new())
            .unwrap();
        assert_eq!(hits[0].asset_id, id);
    }

    // ---- snapshots ----

    #[test]
    fn snapshot_root_and_verify() {
        let engine = engine();
        let mut members = vec![
            put_blob(&engine, b"a"),
            put_blob(&engine, b"b"),
            put_blob(&engine, b"c"),
        ];
        let snapshot = engine
            .create_snapshot("ns", None, BTreeMap::new())
            .unwrap();

        members.sort();
        assert_eq!(snapshot.asset_ids, members);
        assert_eq!(
            snapshot.merkle_root,
            MerkleTree::from_asset_ids(members).root()
        );

        let pubkey = engine.public_key_hex();
        assert!(engine
            .verify_snapshot(&snapshot.snapshot_id, VerifyWith::PublicKey(&pubkey))
            .unwrap());

        // A different key fails verification.
        let other = SigningKey::generate().verifying_key().to_hex();
        assert!(!engine
            .verify_snapshot(&snapshot.snapshot_id, VerifyWith::PublicKey(&other))
            .unwrap());
    }

    #[test]
    fn snapshot_excludes_invisible_assets() {
        let engine = engine();
        put_blob(&engine, b"seen");
        let tx = engine.begin_transaction().unwrap();
        engine
            .put_asset(
                b"dark",
                AssetKind::Blob,
                PutOptions {
                    namespace: "ns".into(),
                    tx_id: Some(tx),
                    ..Default::default()
                },
            )
            .unwrap();
        let snapshot = engine.create_snapshot("ns", None, BTreeMap::new()).unwrap();
        assert_eq!(snapshot.asset_ids.len(), 1);
    }

    #[test]
    fn explicit_invisible_member_is_failed_precondition() {
        let engine = engine();
        let tx = engine.begin_transaction().unwrap();
        let dark = engine
            .put_asset(
                b"dark",
                AssetKind::Blob,
                PutOptions {
                    namespace: "ns".into(),
                    tx_id: Some(tx),
                    ..Default::default()
                },
            )
            .unwrap();
        let err = engine
            .create_snapshot("ns", Some(vec![dark]), BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::FailedPrecondition(_)));
    }

    #[test]
    fn empty_snapshot_allowed_with_flag() {
        let engine = engine();
        let snapshot = engine
            .create_snapshot("empty-ns", None, BTreeMap::new())
            .unwrap();
        assert!(snapshot.asset_ids.is_empty());
        assert_eq!(snapshot.metadata.get("empty").map(String::as_str), Some("true"));
        assert_eq!(snapshot.merkle_root, *blake3::hash(b"").as_bytes());
    }

    #[test]
    fn snapshot_proof_roundtrip() {
        let engine = engine();
        let a = put_blob(&engine, b"a");
        put_blob(&engine, b"b");
        put_blob(&engine, b"c");
        let snapshot = engine.create_snapshot("ns", None, BTreeMap::new()).unwrap();
        let proof = engine.snapshot_proof(&snapshot.snapshot_id, &a).unwrap();
        assert!(proof.verify(&snapshot.merkle_root));
    }

    #[test]
    fn foreign_namespace_key_blocks_snapshot() {
        let engine = engine();
        put_blob(&engine, b"a");
        let foreign = SigningKey::generate().verifying_key().to_hex();
        engine
            .register_namespace_key("ns", &foreign, BTreeMap::new(), false)
            .unwrap();
        let err = engine.create_snapshot("ns", None, BTreeMap::new()).unwrap_err();
        assert!(matches!(err, EngineError::FailedPrecondition(_)));
    }

    #[test]
    fn namespace_key_verification_path() {
        let engine = engine();
        put_blob(&engine, b"a");
        engine.register_own_namespace_key("ns").unwrap();
        let snapshot = engine.create_snapshot("ns", None, BTreeMap::new()).unwrap();
        assert!(engine
            .verify_snapshot(&snapshot.snapshot_id, VerifyWith::NamespaceKey)
            .unwrap());
    }

    #[test]
    fn trusted_key_verification_path() {
        let engine = engine();
        put_blob(&engine, b"a");
        let snapshot = engine.create_snapshot("ns", None, BTreeMap::new()).unwrap();
        engine
            .pin_trusted_key("engine-key", &engine.public_key_hex(), None, BTreeMap::new())
            .unwrap();
        assert!(engine
            .verify_snapshot(&snapshot.snapshot_id, VerifyWith::TrustedKey("engine-key"))
            .unwrap());
        assert!(!engine
            .verify_snapshot(&snapshot.snapshot_id, VerifyWith::TrustedKey("unknown"))
            .unwrap());
    }

    // ---- branches & tags ----

    #[test]
    fn branch_pointer_moves_and_history_appends() {
        let engine = engine();
        put_blob(&engine, b"a");
        let s1 = engine.create_snapshot("ns", None, BTreeMap::new()).unwrap();
        put_blob(&engine, b"b");
        let s2 = engine.create_snapshot("ns", None, BTreeMap::new()).unwrap();

        engine
            .create_branch("ns", "main", &s1.snapshot_id, BTreeMap::new())
            .unwrap();
        engine
            .create_branch("ns", "main", &s2.snapshot_id, BTreeMap::new())
            .unwrap();

        assert_eq!(engine.get_branch("ns", "main").unwrap().snapshot_id, s2.snapshot_id);
        let history = engine.get_branch_history("ns", "main", 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].old_snapshot_id, None);
        assert_eq!(history[0].new_snapshot_id, s1.snapshot_id);
        assert_eq!(history[1].old_snapshot_id, Some(s1.snapshot_id));
        assert_eq!(history[1].new_snapshot_id, s2.snapshot_id);
    }

    #[test]
    fn branch_delete_preserves_history() {
        let engine = engine();
        put_blob(&engine, b"a");
        let s1 = engine.create_snapshot("ns", None, BTreeMap::new()).unwrap();
        engine
            .create_branch("ns", "dev", &s1.snapshot_id, BTreeMap::new())
            .unwrap();
        engine.delete_branch("ns", "dev").unwrap();
        assert!(engine.get_branch("ns", "dev").is_err());
        assert_eq!(engine.get_branch_history("ns", "dev", 10).unwrap().len(), 1);
    }

    #[test]
    fn branch_requires_matching_namespace() {
        let engine = engine();
        put_blob(&engine, b"a");
        let s1 = engine.create_snapshot("ns", None, BTreeMap::new()).unwrap();
        let err = engine
            .create_branch("other", "main", &s1.snapshot_id, BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::FailedPrecondition(_)));
    }

    #[test]
    fn tag_is_immutable() {
        let engine = engine();
        put_blob(&engine, b"a");
        let s1 = engine.create_snapshot("prod", None, BTreeMap::new()).unwrap();
        put_blob(&engine, b"b");
        let s2 = engine.create_snapshot("prod", None, BTreeMap::new()).unwrap();

        engine
            .create_tag("prod", "v1", &s1.snapshot_id, BTreeMap::new())
            .unwrap();
        let err = engine
            .create_tag("prod", "v1", &s2.snapshot_id, BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyExists { .. }));
        assert_eq!(engine.get_tag("prod", "v1").unwrap().snapshot_id, s1.snapshot_id);
    }

    #[test]
    fn invalid_ref_names_rejected() {
        let engine = engine();
        put_blob(&engine, b"a");
        let s1 = engine.create_snapshot("ns", None, BTreeMap::new()).unwrap();
        for bad in ["", "has space", "dot..dot", "/lead", "trail/"] {
            assert!(matches!(
                engine
                    .create_branch("ns", bad, &s1.snapshot_id, BTreeMap::new())
                    .unwrap_err(),
                EngineError::InvalidArgument(_)
            ));
        }
    }

    // ---- misc ----

    #[test]
    fn rotate_chunk_key_keeps_bytes_readable() {
        let engine = engine();
        let id = put_blob(&engine, b"rotate me");
        let rotated = engine.rotate_chunk_key(&id).unwrap();
        assert_eq!(rotated.hash, id);
        assert_eq!(engine.get_asset(&id, true).unwrap().bytes.unwrap(), b"rotate me");
    }

    #[test]
    fn namespaces_are_recorded() {
        let engine = engine();
        put_blob(&engine, b"a");
        let namespaces = engine.list_namespaces().unwrap();
        assert_eq!(namespaces.len(), 1);
        assert_eq!(namespaces[0].name, "ns");
    }

    #[tokio::test]
    async fn commit_publishes_event() {
        let engine = engine();
        let mut rx = engine.subscribe(EventFilter::default());
        let id = put_blob(&engine, b"announce me");
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::AssetCommitted);
        assert_eq!(event.subject, id.to_hex());
    }

    #[test]
    fn cleanup_transactions_prunes_terminal() {
        let engine = engine();
        put_blob(&engine, b"a"); // auto tx commits
        // Anything older than -1s from now (i.e. everything) is eligible.
        let removed = engine.cleanup_transactions(-1).unwrap();
        assert!(removed >= 1);
    }
}
