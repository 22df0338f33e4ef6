use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use aifs_chunk::{ChunkCodec, ChunkRecord};
use aifs_types::{AssetId, AssetKind, SnapshotId, Timestamp, TxId};

use crate::error::{MetaError, MetaResult};
use crate::records::{
    AssetFilter, AssetRecord, BranchHistoryRecord, BranchRecord, LineageEdge, NamespaceKeyRecord,
    NamespaceRecord, SnapshotRecord, TagRecord, TrustedKeyRecord, TxRecord, TxState,
};

/// Current schema version, stored in `PRAGMA user_version`.
const SCHEMA_VERSION: i32 = 1;

/// SQLite-backed metadata store.
///
/// One connection, one writer: every mutation happens inside a SQLite
/// transaction taken on the single connection behind the mutex. WAL mode
/// keeps readers cheap; `synchronous=NORMAL` still fsyncs on commit in WAL
/// mode, which is the durability the commit protocol needs.
pub struct MetaStore {
    conn: Mutex<Connection>,
}

impl MetaStore {
    /// Open (or create) the metadata database at `path` and migrate it.
    pub fn open(path: impl AsRef<Path>) -> MetaResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory database (tests, ephemeral runs).
    pub fn open_in_memory() -> MetaResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("metadata connection poisoned")
    }

    fn migrate(&self) -> MetaResult<()> {
        let conn = self.lock();
        let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version >= SCHEMA_VERSION {
            return Ok(());
        }
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;

            CREATE TABLE IF NOT EXISTS assets (
              asset_id    TEXT PRIMARY KEY,
              kind        TEXT NOT NULL,
              size        INTEGER NOT NULL,
              namespace   TEXT NOT NULL,
              metadata    TEXT,
              created_at  TEXT NOT NULL,
              tx_id       TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_assets_ns_created
              ON assets (namespace, created_at);
            CREATE INDEX IF NOT EXISTS idx_assets_kind ON assets (kind);

            CREATE TABLE IF NOT EXISTS asset_chunks (
              asset_id   TEXT NOT NULL,
              seq        INTEGER NOT NULL,
              chunk_hash TEXT NOT NULL,
              PRIMARY KEY (asset_id, seq)
            );

            CREATE TABLE IF NOT EXISTS chunks (
              chunk_hash        TEXT PRIMARY KEY,
              size_plain        INTEGER NOT NULL,
              size_stored       INTEGER NOT NULL,
              codec             TEXT NOT NULL,
              compression_level INTEGER NOT NULL,
              kms_key_id        TEXT NOT NULL,
              wrapped_dek       TEXT NOT NULL,
              nonce             TEXT NOT NULL,
              aead_tag          TEXT NOT NULL,
              refcount          INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS lineage (
              child_id         TEXT NOT NULL,
              parent_id        TEXT NOT NULL,
              transform_name   TEXT,
              transform_digest TEXT,
              created_at       TEXT NOT NULL,
              PRIMARY KEY (child_id, parent_id)
            );
            CREATE INDEX IF NOT EXISTS idx_lineage_parent ON lineage (parent_id);

            CREATE TABLE IF NOT EXISTS transactions (
              tx_id        TEXT PRIMARY KEY,
              state        TEXT NOT NULL,
              created_at   TEXT NOT NULL,
              committed_at TEXT
            );

            CREATE TABLE IF NOT EXISTS transaction_assets (
              tx_id    TEXT NOT NULL,
              asset_id TEXT NOT NULL,
              PRIMARY KEY (tx_id, asset_id)
            );

            CREATE TABLE IF NOT EXISTS transaction_dependencies (
              tx_id           TEXT NOT NULL,
              parent_asset_id TEXT NOT NULL,
              PRIMARY KEY (tx_id, parent_asset_id)
            );

            CREATE TABLE IF NOT EXISTS asset_visibility (
              asset_id     TEXT PRIMARY KEY,
              visible      INTEGER NOT NULL DEFAULT 0,
              tx_id        TEXT NOT NULL,
              committed_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_visibility_tx ON asset_visibility (tx_id);

            CREATE TABLE IF NOT EXISTS snapshots (
              snapshot_id    TEXT PRIMARY KEY,
              namespace      TEXT NOT NULL,
              merkle_root    TEXT NOT NULL,
              timestamp      TEXT NOT NULL,
              signature      TEXT NOT NULL,
              signer_pubkey  TEXT NOT NULL,
              metadata       TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_snapshots_ns ON snapshots (namespace);

            CREATE TABLE IF NOT EXISTS snapshot_assets (
              snapshot_id TEXT NOT NULL,
              asset_id    TEXT NOT NULL,
              PRIMARY KEY (snapshot_id, asset_id)
            );

            CREATE TABLE IF NOT EXISTS branches (
              branch_name TEXT NOT NULL,
              namespace   TEXT NOT NULL,
              snapshot_id TEXT NOT NULL,
              created_at  TEXT NOT NULL,
              updated_at  TEXT NOT NULL,
              metadata    TEXT,
              PRIMARY KEY (branch_name, namespace)
            );
            CREATE INDEX IF NOT EXISTS idx_branches_ns ON branches (namespace);

            CREATE TABLE IF NOT EXISTS branch_history (
              id              INTEGER PRIMARY KEY AUTOINCREMENT,
              branch_name     TEXT NOT NULL,
              namespace       TEXT NOT NULL,
              old_snapshot_id TEXT,
              new_snapshot_id TEXT NOT NULL,
              at              TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tags (
              tag_name    TEXT NOT NULL,
              namespace   TEXT NOT NULL,
              snapshot_id TEXT NOT NULL,
              created_at  TEXT NOT NULL,
              metadata    TEXT,
              PRIMARY KEY (tag_name, namespace)
            );
            CREATE INDEX IF NOT EXISTS idx_tags_ns ON tags (namespace);

            CREATE TABLE IF NOT EXISTS namespaces (
              name       TEXT PRIMARY KEY,
              metadata   TEXT,
              created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS namespace_keys (
              namespace      TEXT PRIMARY KEY,
              public_key_hex TEXT NOT NULL,
              created_at     TEXT NOT NULL,
              metadata       TEXT
            );

            CREATE TABLE IF NOT EXISTS trusted_keys (
              key_id         TEXT PRIMARY KEY,
              public_key_hex TEXT NOT NULL,
              namespace      TEXT,
              created_at     TEXT NOT NULL,
              metadata       TEXT
            );
            "#,
        )?;
        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
        debug!(version = SCHEMA_VERSION, "metadata schema migrated");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Assets & chunks
    // -----------------------------------------------------------------

    /// Record a new asset with its ordered chunk list, invisible, attached
    /// to `tx_id`. Returns `false` (without touching anything) when the
    /// asset row already exists — content addressing makes re-puts no-ops.
    pub fn insert_asset(
        &self,
        record: &AssetRecord,
        chunks: &[ChunkRecord],
    ) -> MetaResult<bool> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO assets
               (asset_id, kind, size, namespace, metadata, created_at, tx_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.asset_id.to_hex(),
                record.kind.as_str(),
                record.size as i64,
                record.namespace,
                meta_json(&record.metadata),
                record.created_at.to_rfc3339(),
                record.tx_id.to_string(),
            ],
        )?;
        if inserted == 0 {
            return Ok(false);
        }

        for (seq, chunk) in chunks.iter().enumerate() {
            tx.execute(
                "INSERT INTO asset_chunks (asset_id, seq, chunk_hash) VALUES (?1, ?2, ?3)",
                params![record.asset_id.to_hex(), seq as i64, chunk.hash.to_hex()],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO chunks
                   (chunk_hash, size_plain, size_stored, codec, compression_level,
                    kms_key_id, wrapped_dek, nonce, aead_tag, refcount)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0)",
                params![
                    chunk.hash.to_hex(),
                    chunk.size_plain as i64,
                    chunk.size_stored as i64,
                    codec_str(chunk.codec),
                    chunk.compression_level,
                    chunk.kms_key_id,
                    chunk.wrapped_dek,
                    chunk.nonce,
                    chunk.aead_tag,
                ],
            )?;
            tx.execute(
                "UPDATE chunks SET refcount = refcount + 1 WHERE chunk_hash = ?1",
                params![chunk.hash.to_hex()],
            )?;
        }

        tx.execute(
            "INSERT OR REPLACE INTO asset_visibility (asset_id, visible, tx_id, committed_at)
             VALUES (?1, 0, ?2, NULL)",
            params![record.asset_id.to_hex(), record.tx_id.to_string()],
        )?;

        tx.commit()?;
        Ok(true)
    }

    /// Look up one asset row.
    pub fn get_asset(&self, asset_id: &AssetId) -> MetaResult<Option<AssetRecord>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT asset_id, kind, size, namespace, metadata, created_at, tx_id
             FROM assets WHERE asset_id = ?1",
            params![asset_id.to_hex()],
            row_to_asset,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Ordered chunk hashes backing an asset.
    pub fn asset_chunks(&self, asset_id: &AssetId) -> MetaResult<Vec<AssetId>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT chunk_hash FROM asset_chunks WHERE asset_id = ?1 ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map(params![asset_id.to_hex()], |row| row.get::<_, String>(0))?;
        rows.map(|r| parse_asset_id(&r?))
            .collect::<MetaResult<Vec<_>>>()
    }

    /// Stored chunk record.
    pub fn get_chunk(&self, chunk_hash: &AssetId) -> MetaResult<Option<ChunkRecord>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT chunk_hash, size_plain, size_stored, codec, compression_level,
                    kms_key_id, wrapped_dek, nonce, aead_tag
             FROM chunks WHERE chunk_hash = ?1",
            params![chunk_hash.to_hex()],
            row_to_chunk,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Update a chunk's key envelope after rotation.
    pub fn update_chunk_key(&self, record: &ChunkRecord) -> MetaResult<()> {
        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE chunks SET kms_key_id = ?1, wrapped_dek = ?2 WHERE chunk_hash = ?3",
            params![record.kms_key_id, record.wrapped_dek, record.hash.to_hex()],
        )?;
        if updated == 0 {
            return Err(MetaError::NotFound {
                what: "chunk",
                id: record.hash.to_hex(),
            });
        }
        Ok(())
    }

    /// Delete an asset: drop its rows, lineage edges, and visibility, and
    /// decrement its chunks' refcounts. Chunks themselves stay on disk
    /// until an admin prune.
    pub fn delete_asset(&self, asset_id: &AssetId) -> MetaResult<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let id_hex = asset_id.to_hex();

        let existed = tx.execute("DELETE FROM assets WHERE asset_id = ?1", params![id_hex])?;
        if existed == 0 {
            return Err(MetaError::NotFound {
                what: "asset",
                id: id_hex,
            });
        }
        tx.execute(
            "UPDATE chunks SET refcount = refcount - 1
             WHERE chunk_hash IN (SELECT chunk_hash FROM asset_chunks WHERE asset_id = ?1)",
            params![id_hex],
        )?;
        tx.execute("DELETE FROM asset_chunks WHERE asset_id = ?1", params![id_hex])?;
        tx.execute("DELETE FROM asset_visibility WHERE asset_id = ?1", params![id_hex])?;
        tx.execute(
            "DELETE FROM lineage WHERE child_id = ?1 OR parent_id = ?1",
            params![id_hex],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Chunk hashes whose refcount has dropped to zero.
    pub fn zero_ref_chunks(&self) -> MetaResult<Vec<AssetId>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT chunk_hash FROM chunks WHERE refcount <= 0")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.map(|r| parse_asset_id(&r?))
            .collect::<MetaResult<Vec<_>>>()
    }

    /// Drop a chunk row (after the stored bytes were pruned).
    pub fn delete_chunk_row(&self, chunk_hash: &AssetId) -> MetaResult<()> {
        let conn = self.lock();
        conn.execute(
            "DELETE FROM chunks WHERE chunk_hash = ?1",
            params![chunk_hash.to_hex()],
        )?;
        Ok(())
    }

    /// List visible assets matching the filter, newest first.
    pub fn list_assets(&self, filter: &AssetFilter) -> MetaResult<Vec<AssetRecord>> {
        let limit = if filter.limit == 0 { 100 } else { filter.limit };
        let offset: i64 = filter
            .cursor
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or(0);
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT a.asset_id, a.kind, a.size, a.namespace, a.metadata, a.created_at, a.tx_id
             FROM assets a
             JOIN asset_visibility v ON v.asset_id = a.asset_id AND v.visible = 1
             WHERE (?1 IS NULL OR a.namespace = ?1)
               AND (?2 IS NULL OR a.kind = ?2)
             ORDER BY a.created_at DESC, a.asset_id DESC
             LIMIT ?3 OFFSET ?4",
        )?;
        let rows = stmt.query_map(
            params![
                filter.namespace,
                filter.kind.map(|k| k.as_str()),
                limit,
                offset
            ],
            row_to_asset,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // -----------------------------------------------------------------
    // Visibility & transactions
    // -----------------------------------------------------------------

    /// Whether an asset is visible (its transaction committed).
    pub fn is_visible(&self, asset_id: &AssetId) -> MetaResult<bool> {
        let conn = self.lock();
        let visible: Option<i64> = conn
            .query_row(
                "SELECT visible FROM asset_visibility WHERE asset_id = ?1",
                params![asset_id.to_hex()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(visible == Some(1))
    }

    /// All visible asset ids in a namespace, lexicographically sorted.
    pub fn visible_assets(&self, namespace: &str) -> MetaResult<Vec<AssetId>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT a.asset_id FROM assets a
             JOIN asset_visibility v ON v.asset_id = a.asset_id AND v.visible = 1
             WHERE a.namespace = ?1
             ORDER BY a.asset_id ASC",
        )?;
        let rows = stmt.query_map(params![namespace], |row| row.get::<_, String>(0))?;
        rows.map(|r| parse_asset_id(&r?))
            .collect::<MetaResult<Vec<_>>>()
    }

    /// Create a transaction row in `Pending`.
    pub fn insert_tx(&self, tx_id: &TxId, created_at: Timestamp) -> MetaResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO transactions (tx_id, state, created_at) VALUES (?1, ?2, ?3)",
            params![
                tx_id.to_string(),
                TxState::Pending.as_str(),
                created_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Record a state transition.
    pub fn set_tx_state(&self, tx_id: &TxId, state: TxState) -> MetaResult<()> {
        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE transactions SET state = ?1 WHERE tx_id = ?2",
            params![state.as_str(), tx_id.to_string()],
        )?;
        if updated == 0 {
            return Err(MetaError::NotFound {
                what: "transaction",
                id: tx_id.to_string(),
            });
        }
        Ok(())
    }

    /// Fetch a transaction row.
    pub fn get_tx(&self, tx_id: &TxId) -> MetaResult<Option<TxRecord>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT tx_id, state, created_at, committed_at FROM transactions WHERE tx_id = ?1",
            params![tx_id.to_string()],
            row_to_tx,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Attach an asset to a transaction.
    pub fn add_tx_asset(&self, tx_id: &TxId, asset_id: &AssetId) -> MetaResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR IGNORE INTO transaction_assets (tx_id, asset_id) VALUES (?1, ?2)",
            params![tx_id.to_string(), asset_id.to_hex()],
        )?;
        Ok(())
    }

    /// Declare a parent dependency for a transaction.
    pub fn add_tx_dependency(&self, tx_id: &TxId, parent: &AssetId) -> MetaResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR IGNORE INTO transaction_dependencies (tx_id, parent_asset_id)
             VALUES (?1, ?2)",
            params![tx_id.to_string(), parent.to_hex()],
        )?;
        Ok(())
    }

    /// Declared dependencies that are not currently visible.
    pub fn unmet_dependencies(&self, tx_id: &TxId) -> MetaResult<Vec<AssetId>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT td.parent_asset_id FROM transaction_dependencies td
             WHERE td.tx_id = ?1
               AND NOT EXISTS (
                 SELECT 1 FROM asset_visibility av
                 WHERE av.asset_id = td.parent_asset_id AND av.visible = 1
               )",
        )?;
        let rows = stmt.query_map(params![tx_id.to_string()], |row| row.get::<_, String>(0))?;
        rows.map(|r| parse_asset_id(&r?))
            .collect::<MetaResult<Vec<_>>>()
    }

    /// Assets attached to a transaction.
    pub fn tx_assets(&self, tx_id: &TxId) -> MetaResult<Vec<AssetId>> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare("SELECT asset_id FROM transaction_assets WHERE tx_id = ?1")?;
        let rows = stmt.query_map(params![tx_id.to_string()], |row| row.get::<_, String>(0))?;
        rows.map(|r| parse_asset_id(&r?))
            .collect::<MetaResult<Vec<_>>>()
    }

    /// Commit: flip every attached asset visible and mark the transaction
    /// committed, all in one durable SQLite transaction.
    pub fn commit_tx(
        &self,
        tx_id: &TxId,
        assets: &[AssetId],
        committed_at: Timestamp,
    ) -> MetaResult<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE transactions SET state = ?1, committed_at = ?2 WHERE tx_id = ?3",
            params![
                TxState::Committed.as_str(),
                committed_at.to_rfc3339(),
                tx_id.to_string()
            ],
        )?;
        for asset in assets {
            tx.execute(
                "INSERT OR REPLACE INTO asset_visibility (asset_id, visible, tx_id, committed_at)
                 VALUES (?1, 1, ?2, ?3)",
                params![
                    asset.to_hex(),
                    tx_id.to_string(),
                    committed_at.to_rfc3339()
                ],
            )?;
        }
        tx.commit()?;
        debug!(tx = %tx_id, assets = assets.len(), "transaction committed");
        Ok(())
    }

    /// Roll back: remove tx-scoped rows and every trace of the attached
    /// assets, in one durable SQLite transaction. Assets never become
    /// visible.
    pub fn rollback_tx(&self, tx_id: &TxId) -> MetaResult<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let tx_hex = tx_id.to_string();

        let asset_ids: Vec<String> = {
            let mut stmt =
                tx.prepare("SELECT asset_id FROM transaction_assets WHERE tx_id = ?1")?;
            let rows = stmt.query_map(params![tx_hex], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        for id_hex in &asset_ids {
            tx.execute(
                "UPDATE chunks SET refcount = refcount - 1
                 WHERE chunk_hash IN (SELECT chunk_hash FROM asset_chunks WHERE asset_id = ?1)",
                params![id_hex],
            )?;
            tx.execute("DELETE FROM asset_chunks WHERE asset_id = ?1", params![id_hex])?;
            tx.execute("DELETE FROM assets WHERE asset_id = ?1", params![id_hex])?;
            tx.execute(
                "DELETE FROM asset_visibility WHERE asset_id = ?1",
                params![id_hex],
            )?;
            tx.execute(
                "DELETE FROM lineage WHERE child_id = ?1 OR parent_id = ?1",
                params![id_hex],
            )?;
        }
        tx.execute("DELETE FROM transaction_assets WHERE tx_id = ?1", params![tx_hex])?;
        tx.execute(
            "DELETE FROM transaction_dependencies WHERE tx_id = ?1",
            params![tx_hex],
        )?;
        tx.execute(
            "UPDATE transactions SET state = ?1 WHERE tx_id = ?2",
            params![TxState::RolledBack.as_str(), tx_hex],
        )?;
        tx.commit()?;
        debug!(tx = %tx_id, assets = asset_ids.len(), "transaction rolled back");
        Ok(())
    }

    /// Remove terminal transactions created before `cutoff`. Visibility
    /// rows are untouched; they are the durable record for committed
    /// assets. Returns the number removed.
    pub fn cleanup_transactions(&self, cutoff: Timestamp) -> MetaResult<usize> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let old: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT tx_id FROM transactions
                 WHERE state IN ('committed', 'rolled_back', 'failed') AND created_at < ?1",
            )?;
            let rows = stmt.query_map(params![cutoff.to_rfc3339()], |row| {
                row.get::<_, String>(0)
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        for tx_id in &old {
            tx.execute("DELETE FROM transactions WHERE tx_id = ?1", params![tx_id])?;
            tx.execute("DELETE FROM transaction_assets WHERE tx_id = ?1", params![tx_id])?;
            tx.execute(
                "DELETE FROM transaction_dependencies WHERE tx_id = ?1",
                params![tx_id],
            )?;
        }
        tx.commit()?;
        Ok(old.len())
    }

    // -----------------------------------------------------------------
    // Lineage
    // -----------------------------------------------------------------

    /// Insert lineage edges for a child, rejecting any edge that would
    /// close a cycle. The check walks ancestors from each candidate parent
    /// before anything is written.
    pub fn add_lineage_edges(&self, edges: &[LineageEdge], at: Timestamp) -> MetaResult<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        for edge in edges {
            if edge.child_id == edge.parent_id {
                return Err(MetaError::CycleDetected {
                    child: edge.child_id,
                    parent: edge.parent_id,
                });
            }
            // BFS upward from the parent; reaching the child means the
            // child is already an ancestor of the parent.
            let mut frontier = vec![edge.parent_id.to_hex()];
            let mut seen = std::collections::HashSet::new();
            while let Some(current) = frontier.pop() {
                if !seen.insert(current.clone()) {
                    continue;
                }
                let mut stmt =
                    tx.prepare("SELECT parent_id FROM lineage WHERE child_id = ?1")?;
                let parents = stmt.query_map(params![current], |row| row.get::<_, String>(0))?;
                for parent in parents {
                    let parent = parent?;
                    if parent == edge.child_id.to_hex() {
                        return Err(MetaError::CycleDetected {
                            child: edge.child_id,
                            parent: edge.parent_id,
                        });
                    }
                    frontier.push(parent);
                }
            }
        }

        for edge in edges {
            tx.execute(
                "INSERT OR IGNORE INTO lineage
                   (child_id, parent_id, transform_name, transform_digest, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    edge.child_id.to_hex(),
                    edge.parent_id.to_hex(),
                    edge.transform_name,
                    edge.transform_digest,
                    at.to_rfc3339(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Parents of an asset.
    pub fn get_parents(&self, asset_id: &AssetId) -> MetaResult<Vec<LineageEdge>> {
        self.lineage_query(
            "SELECT child_id, parent_id, transform_name, transform_digest
             FROM lineage WHERE child_id = ?1",
            asset_id,
        )
    }

    /// Children of an asset.
    pub fn get_children(&self, asset_id: &AssetId) -> MetaResult<Vec<LineageEdge>> {
        self.lineage_query(
            "SELECT child_id, parent_id, transform_name, transform_digest
             FROM lineage WHERE parent_id = ?1",
            asset_id,
        )
    }

    fn lineage_query(&self, sql: &str, asset_id: &AssetId) -> MetaResult<Vec<LineageEdge>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![asset_id.to_hex()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;
        rows.map(|r| {
            let (child, parent, name, digest) = r?;
            Ok(LineageEdge {
                child_id: parse_asset_id(&child)?,
                parent_id: parse_asset_id(&parent)?,
                transform_name: name,
                transform_digest: digest,
            })
        })
        .collect()
    }

    // -----------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------

    /// Persist a snapshot and its member list. Fails with `AlreadyExists`
    /// on snapshot id collision.
    pub fn create_snapshot(&self, record: &SnapshotRecord) -> MetaResult<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO snapshots
               (snapshot_id, namespace, merkle_root, timestamp, signature, signer_pubkey, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.snapshot_id.to_hex(),
                record.namespace,
                hex::encode(record.merkle_root),
                record.timestamp.to_rfc3339(),
                record.signature_hex,
                record.signer_pubkey_hex,
                meta_json(&record.metadata),
            ],
        )?;
        if inserted == 0 {
            return Err(MetaError::AlreadyExists {
                what: "snapshot",
                id: record.snapshot_id.to_hex(),
            });
        }
        for asset in &record.asset_ids {
            tx.execute(
                "INSERT OR IGNORE INTO snapshot_assets (snapshot_id, asset_id) VALUES (?1, ?2)",
                params![record.snapshot_id.to_hex(), asset.to_hex()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Load a snapshot with its sorted member ids.
    pub fn get_snapshot(&self, snapshot_id: &SnapshotId) -> MetaResult<Option<SnapshotRecord>> {
        let conn = self.lock();
        let base = conn
            .query_row(
                "SELECT snapshot_id, namespace, merkle_root, timestamp, signature,
                        signer_pubkey, metadata
                 FROM snapshots WHERE snapshot_id = ?1",
                params![snapshot_id.to_hex()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Option<String>>(6)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, namespace, root_hex, ts, sig, pubkey, metadata)) = base else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT asset_id FROM snapshot_assets WHERE snapshot_id = ?1 ORDER BY asset_id ASC",
        )?;
        let rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
        let asset_ids = rows
            .map(|r| parse_asset_id(&r?))
            .collect::<MetaResult<Vec<_>>>()?;

        let root_bytes = hex::decode(&root_hex)
            .map_err(|e| MetaError::InvalidRecord(format!("merkle root: {e}")))?;
        let merkle_root: [u8; 32] = root_bytes
            .try_into()
            .map_err(|_| MetaError::InvalidRecord("merkle root length".into()))?;

        Ok(Some(SnapshotRecord {
            snapshot_id: SnapshotId::from_hex(&id)
                .map_err(|e| MetaError::InvalidRecord(e.to_string()))?,
            namespace,
            merkle_root,
            timestamp: Timestamp::parse(&ts)
                .map_err(|e| MetaError::InvalidRecord(e.to_string()))?,
            signature_hex: sig,
            signer_pubkey_hex: pubkey,
            metadata: parse_meta(metadata),
            asset_ids,
        }))
    }

    /// Snapshot ids in a namespace, newest timestamp first.
    pub fn list_snapshots(&self, namespace: &str, limit: u32) -> MetaResult<Vec<SnapshotId>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT snapshot_id FROM snapshots WHERE namespace = ?1
             ORDER BY timestamp DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![namespace, limit.max(1)], |row| {
            row.get::<_, String>(0)
        })?;
        rows.map(|r| {
            SnapshotId::from_hex(&r?).map_err(|e| MetaError::InvalidRecord(e.to_string()))
        })
        .collect()
    }

    // -----------------------------------------------------------------
    // Branches & tags
    // -----------------------------------------------------------------

    /// Create or move a branch pointer, appending the history row in the
    /// same SQLite transaction. Returns the previous target, if any.
    pub fn upsert_branch(
        &self,
        namespace: &str,
        name: &str,
        snapshot_id: &SnapshotId,
        at: Timestamp,
        metadata: &BTreeMap<String, String>,
    ) -> MetaResult<Option<SnapshotId>> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let old: Option<String> = tx
            .query_row(
                "SELECT snapshot_id FROM branches WHERE branch_name = ?1 AND namespace = ?2",
                params![name, namespace],
                |row| row.get(0),
            )
            .optional()?;

        if old.is_some() {
            tx.execute(
                "UPDATE branches SET snapshot_id = ?1, updated_at = ?2, metadata = ?3
                 WHERE branch_name = ?4 AND namespace = ?5",
                params![
                    snapshot_id.to_hex(),
                    at.to_rfc3339(),
                    meta_json(metadata),
                    name,
                    namespace
                ],
            )?;
        } else {
            tx.execute(
                "INSERT INTO branches
                   (branch_name, namespace, snapshot_id, created_at, updated_at, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?4, ?5)",
                params![
                    name,
                    namespace,
                    snapshot_id.to_hex(),
                    at.to_rfc3339(),
                    meta_json(metadata)
                ],
            )?;
        }

        tx.execute(
            "INSERT INTO branch_history
               (branch_name, namespace, old_snapshot_id, new_snapshot_id, at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![name, namespace, old, snapshot_id.to_hex(), at.to_rfc3339()],
        )?;
        tx.commit()?;

        old.map(|o| SnapshotId::from_hex(&o).map_err(|e| MetaError::InvalidRecord(e.to_string())))
            .transpose()
    }

    /// Look up a branch.
    pub fn get_branch(&self, namespace: &str, name: &str) -> MetaResult<Option<BranchRecord>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT branch_name, namespace, snapshot_id, created_at, updated_at, metadata
             FROM branches WHERE branch_name = ?1 AND namespace = ?2",
            params![name, namespace],
            row_to_branch,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Branches in a namespace, by name.
    pub fn list_branches(&self, namespace: &str, limit: u32) -> MetaResult<Vec<BranchRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT branch_name, namespace, snapshot_id, created_at, updated_at, metadata
             FROM branches WHERE namespace = ?1 ORDER BY branch_name ASC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![namespace, limit.max(1)], row_to_branch)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Remove a branch pointer. History is preserved.
    pub fn delete_branch(&self, namespace: &str, name: &str) -> MetaResult<bool> {
        let conn = self.lock();
        let deleted = conn.execute(
            "DELETE FROM branches WHERE branch_name = ?1 AND namespace = ?2",
            params![name, namespace],
        )?;
        Ok(deleted > 0)
    }

    /// History entries for a branch, oldest first.
    pub fn branch_history(
        &self,
        namespace: &str,
        name: &str,
        limit: u32,
    ) -> MetaResult<Vec<BranchHistoryRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT branch_name, namespace, old_snapshot_id, new_snapshot_id, at
             FROM branch_history
             WHERE branch_name = ?1 AND namespace = ?2
             ORDER BY id ASC LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![name, namespace, limit.max(1)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        rows.map(|r| {
            let (name, namespace, old, new, at) = r?;
            Ok(BranchHistoryRecord {
                name,
                namespace,
                old_snapshot_id: old
                    .map(|o| {
                        SnapshotId::from_hex(&o)
                            .map_err(|e| MetaError::InvalidRecord(e.to_string()))
                    })
                    .transpose()?,
                new_snapshot_id: SnapshotId::from_hex(&new)
                    .map_err(|e| MetaError::InvalidRecord(e.to_string()))?,
                at: Timestamp::parse(&at).map_err(|e| MetaError::InvalidRecord(e.to_string()))?,
            })
        })
        .collect()
    }

    /// Create a tag. Tags are immutable: re-creation fails.
    pub fn create_tag(&self, record: &TagRecord) -> MetaResult<()> {
        let conn = self.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO tags (tag_name, namespace, snapshot_id, created_at, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.name,
                record.namespace,
                record.snapshot_id.to_hex(),
                record.created_at.to_rfc3339(),
                meta_json(&record.metadata),
            ],
        )?;
        if inserted == 0 {
            return Err(MetaError::AlreadyExists {
                what: "tag",
                id: format!("{}/{}", record.namespace, record.name),
            });
        }
        Ok(())
    }

    /// Look up a tag.
    pub fn get_tag(&self, namespace: &str, name: &str) -> MetaResult<Option<TagRecord>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT tag_name, namespace, snapshot_id, created_at, metadata
             FROM tags WHERE tag_name = ?1 AND namespace = ?2",
            params![name, namespace],
            row_to_tag,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Tags in a namespace, by name.
    pub fn list_tags(&self, namespace: &str, limit: u32) -> MetaResult<Vec<TagRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT tag_name, namespace, snapshot_id, created_at, metadata
             FROM tags WHERE namespace = ?1 ORDER BY tag_name ASC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![namespace, limit.max(1)], row_to_tag)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // -----------------------------------------------------------------
    // Namespaces & keys
    // -----------------------------------------------------------------

    /// Ensure a namespace row exists.
    pub fn ensure_namespace(&self, name: &str, at: Timestamp) -> MetaResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR IGNORE INTO namespaces (name, metadata, created_at) VALUES (?1, NULL, ?2)",
            params![name, at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// All namespaces, by name.
    pub fn list_namespaces(&self) -> MetaResult<Vec<NamespaceRecord>> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare("SELECT name, metadata, created_at FROM namespaces ORDER BY name ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        rows.map(|r| {
            let (name, metadata, created_at) = r?;
            Ok(NamespaceRecord {
                name,
                metadata: parse_meta(metadata),
                created_at: Timestamp::parse(&created_at)
                    .map_err(|e| MetaError::InvalidRecord(e.to_string()))?,
            })
        })
        .collect()
    }

    /// Register a namespace verification key. Without `overwrite`, a
    /// second registration for the same namespace fails.
    pub fn register_namespace_key(
        &self,
        record: &NamespaceKeyRecord,
        overwrite: bool,
    ) -> MetaResult<()> {
        let conn = self.lock();
        let sql = if overwrite {
            "INSERT OR REPLACE INTO namespace_keys (namespace, public_key_hex, created_at, metadata)
             VALUES (?1, ?2, ?3, ?4)"
        } else {
            "INSERT OR IGNORE INTO namespace_keys (namespace, public_key_hex, created_at, metadata)
             VALUES (?1, ?2, ?3, ?4)"
        };
        let inserted = conn.execute(
            sql,
            params![
                record.namespace,
                record.public_key_hex,
                record.created_at.to_rfc3339(),
                meta_json(&record.metadata),
            ],
        )?;
        if inserted == 0 {
            return Err(MetaError::AlreadyExists {
                what: "namespace key",
                id: record.namespace.clone(),
            });
        }
        Ok(())
    }

    /// Registered key for a namespace.
    pub fn get_namespace_key(&self, namespace: &str) -> MetaResult<Option<NamespaceKeyRecord>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT namespace, public_key_hex, created_at, metadata
             FROM namespace_keys WHERE namespace = ?1",
            params![namespace],
            row_to_namespace_key,
        )
        .optional()
        .map_err(Into::into)
    }

    /// All registered namespace keys.
    pub fn list_namespace_keys(&self) -> MetaResult<Vec<NamespaceKeyRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT namespace, public_key_hex, created_at, metadata
             FROM namespace_keys ORDER BY namespace ASC",
        )?;
        let rows = stmt.query_map([], row_to_namespace_key)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Pin (or re-pin) a trusted key by id.
    pub fn pin_trusted_key(&self, record: &TrustedKeyRecord) -> MetaResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR REPLACE INTO trusted_keys
               (key_id, public_key_hex, namespace, created_at, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.key_id,
                record.public_key_hex,
                record.namespace,
                record.created_at.to_rfc3339(),
                meta_json(&record.metadata),
            ],
        )?;
        Ok(())
    }

    /// Pinned key by id.
    pub fn get_trusted_key(&self, key_id: &str) -> MetaResult<Option<TrustedKeyRecord>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT key_id, public_key_hex, namespace, created_at, metadata
             FROM trusted_keys WHERE key_id = ?1",
            params![key_id],
            row_to_trusted_key,
        )
        .optional()
        .map_err(Into::into)
    }

    /// All pinned trusted keys.
    pub fn list_trusted_keys(&self) -> MetaResult<Vec<TrustedKeyRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT key_id, public_key_hex, namespace, created_at, metadata
             FROM trusted_keys ORDER BY key_id ASC",
        )?;
        let rows = stmt.query_map([], row_to_trusted_key)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Row counts for introspection: (assets, chunks, snapshots).
    pub fn counts(&self) -> MetaResult<(u64, u64, u64)> {
        let conn = self.lock();
        let assets: i64 = conn.query_row("SELECT COUNT(*) FROM assets", [], |r| r.get(0))?;
        let chunks: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |r| r.get(0))?;
        let snaps: i64 = conn.query_row("SELECT COUNT(*) FROM snapshots", [], |r| r.get(0))?;
        Ok((assets as u64, chunks as u64, snaps as u64))
    }
}

impl std::fmt::Debug for MetaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MetaStore")
    }
}

// ---------------------------------------------------------------------
// Row mapping helpers
// ---------------------------------------------------------------------

fn meta_json(meta: &BTreeMap<String, String>) -> Option<String> {
    if meta.is_empty() {
        None
    } else {
        Some(serde_json::to_string(meta).expect("string map serializes"))
    }
}

fn parse_meta(raw: Option<String>) -> BTreeMap<String, String> {
    raw.and_then(|s| serde_json::from_str(&s).ok()).unwrap_or_default()
}

fn parse_asset_id(hex: &str) -> MetaResult<AssetId> {
    AssetId::from_hex(hex).map_err(|e| MetaError::InvalidRecord(e.to_string()))
}

fn codec_str(codec: ChunkCodec) -> &'static str {
    match codec {
        ChunkCodec::None => "none",
        ChunkCodec::Zstd => "zstd",
    }
}

fn row_to_asset(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssetRecord> {
    let id: String = row.get(0)?;
    let kind: String = row.get(1)?;
    let size: i64 = row.get(2)?;
    let namespace: String = row.get(3)?;
    let metadata: Option<String> = row.get(4)?;
    let created_at: String = row.get(5)?;
    let tx_id: String = row.get(6)?;
    Ok(AssetRecord {
        asset_id: AssetId::from_hex(&id).map_err(|_| invalid_row())?,
        kind: AssetKind::parse(&kind).map_err(|_| invalid_row())?,
        size: size as u64,
        namespace,
        metadata: parse_meta(metadata),
        created_at: Timestamp::parse(&created_at).map_err(|_| invalid_row())?,
        tx_id: TxId::parse(&tx_id).map_err(|_| invalid_row())?,
    })
}

fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChunkRecord> {
    let hash: String = row.get(0)?;
    let size_plain: i64 = row.get(1)?;
    let size_stored: i64 = row.get(2)?;
    let codec: String = row.get(3)?;
    Ok(ChunkRecord {
        hash: AssetId::from_hex(&hash).map_err(|_| invalid_row())?,
        size_plain: size_plain as u64,
        size_stored: size_stored as u64,
        codec: match codec.as_str() {
            "zstd" => ChunkCodec::Zstd,
            _ => ChunkCodec::None,
        },
        compression_level: row.get(4)?,
        kms_key_id: row.get(5)?,
        wrapped_dek: row.get(6)?,
        nonce: row.get(7)?,
        aead_tag: row.get(8)?,
    })
}

fn row_to_tx(row: &rusqlite::Row<'_>) -> rusqlite::Result<TxRecord> {
    let tx_id: String = row.get(0)?;
    let state: String = row.get(1)?;
    let created_at: String = row.get(2)?;
    let committed_at: Option<String> = row.get(3)?;
    Ok(TxRecord {
        tx_id: TxId::parse(&tx_id).map_err(|_| invalid_row())?,
        state: TxState::parse(&state).ok_or_else(invalid_row)?,
        created_at: Timestamp::parse(&created_at).map_err(|_| invalid_row())?,
        committed_at: committed_at
            .map(|c| Timestamp::parse(&c).map_err(|_| invalid_row()))
            .transpose()?,
    })
}

fn row_to_branch(row: &rusqlite::Row<'_>) -> rusqlite::Result<BranchRecord> {
    let name: String = row.get(0)?;
    let namespace: String = row.get(1)?;
    let snapshot: String = row.get(2)?;
    let created_at: String = row.get(3)?;
    let updated_at: String = row.get(4)?;
    let metadata: Option<String> = row.get(5)?;
    Ok(BranchRecord {
        name,
        namespace,
        snapshot_id: SnapshotId::from_hex(&snapshot).map_err(|_| invalid_row())?,
        created_at: Timestamp::parse(&created_at).map_err(|_| invalid_row())?,
        updated_at: Timestamp::parse(&updated_at).map_err(|_| invalid_row())?,
        metadata: parse_meta(metadata),
    })
}

fn row_to_tag(row: &rusqlite::Row<'_>) -> rusqlite::Result<TagRecord> {
    let name: String = row.get(0)?;
    let namespace: String = row.get(1)?;
    let snapshot: String = row.get(2)?;
    let created_at: String = row.get(3)?;
    let metadata: Option<String> = row.get(4)?;
    Ok(TagRecord {
        name,
        namespace,
        snapshot_id: SnapshotId::from_hex(&snapshot).map_err(|_| invalid_row())?,
        created_at: Timestamp::parse(&created_at).map_err(|_| invalid_row())?,
        metadata: parse_meta(metadata),
    })
}

fn row_to_namespace_key(row: &rusqlite::Row<'_>) -> rusqlite::Result<NamespaceKeyRecord> {
    let namespace: String = row.get(0)?;
    let public_key_hex: String = row.get(1)?;
    let created_at: String = row.get(2)?;
    let metadata: Option<String> = row.get(3)?;
    Ok(NamespaceKeyRecord {
        namespace,
        public_key_hex,
        created_at: Timestamp::parse(&created_at).map_err(|_| invalid_row())?,
        metadata: parse_meta(metadata),
    })
}

fn row_to_trusted_key(row: &rusqlite::Row<'_>) -> rusqlite::Result<TrustedKeyRecord> {
    let key_id: String = row.get(0)?;
    let public_key_hex: String = row.get(1)?;
    let namespace: Option<String> = row.get(2)?;
    let created_at: String = row.get(3)?;
    let metadata: Option<String> = row.get(4)?;
    Ok(TrustedKeyRecord {
        key_id,
        public_key_hex,
        namespace,
        created_at: Timestamp::parse(&created_at).map_err(|_| invalid_row())?,
        metadata: parse_meta(metadata),
    })
}

fn invalid_row() -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(0, "record".into(), rusqlite::types::Type::Text)
}
