use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use aifs_meta::{MetaStore, TxState};
use aifs_types::{AssetId, Timestamp, TxId};

use crate::error::{TxError, TxResult};

/// In-memory view of one active transaction.
#[derive(Debug, Clone)]
struct ActiveTx {
    state: TxState,
    assets: Vec<AssetId>,
    dependencies: Vec<AssetId>,
}

/// Transaction manager.
///
/// Active (non-terminal) transactions live in the in-memory table; every
/// state transition is mirrored to the metadata store before the in-memory
/// view changes, so a crash can only lose transactions that were still
/// `pending` — which a restart treats as implicitly rolled back since
/// their assets never became visible.
pub struct TransactionManager {
    meta: Arc<MetaStore>,
    active: Mutex<HashMap<TxId, ActiveTx>>,
}

impl TransactionManager {
    pub fn new(meta: Arc<MetaStore>) -> Self {
        Self {
            meta,
            active: Mutex::new(HashMap::new()),
        }
    }

    fn table(&self) -> MutexGuard<'_, HashMap<TxId, ActiveTx>> {
        self.active.lock().expect("transaction table poisoned")
    }

    /// Begin a new transaction in `Pending`.
    pub fn begin(&self) -> TxResult<TxId> {
        let tx_id = TxId::new();
        self.meta.insert_tx(&tx_id, Timestamp::now())?;
        self.table().insert(
            tx_id,
            ActiveTx {
                state: TxState::Pending,
                assets: Vec::new(),
                dependencies: Vec::new(),
            },
        );
        debug!(tx = %tx_id, "transaction started");
        Ok(tx_id)
    }

    /// Attach a newly created asset. Valid only while `Pending`.
    pub fn add_asset(&self, tx_id: &TxId, asset_id: AssetId) -> TxResult<()> {
        let mut table = self.table();
        let tx = table.get_mut(tx_id).ok_or(TxError::NotFound(*tx_id))?;
        if tx.state != TxState::Pending {
            return Err(TxError::InvalidState {
                tx_id: *tx_id,
                state: tx.state,
                required: "pending",
            });
        }
        self.meta.add_tx_asset(tx_id, &asset_id)?;
        if !tx.assets.contains(&asset_id) {
            tx.assets.push(asset_id);
        }
        Ok(())
    }

    /// Declare a parent dependency. Valid only while `Pending`.
    pub fn add_dependency(&self, tx_id: &TxId, parent: AssetId) -> TxResult<()> {
        let mut table = self.table();
        let tx = table.get_mut(tx_id).ok_or(TxError::NotFound(*tx_id))?;
        if tx.state != TxState::Pending {
            return Err(TxError::InvalidState {
                tx_id: *tx_id,
                state: tx.state,
                required: "pending",
            });
        }
        self.meta.add_tx_dependency(tx_id, &parent)?;
        if !tx.dependencies.contains(&parent) {
            tx.dependencies.push(parent);
        }
        Ok(())
    }

    /// Commit: verify every declared parent is visible, then atomically
    /// flip visibility for all attached assets and mark the transaction
    /// committed.
    ///
    /// On unmet dependencies the transaction moves to `Failed` and the
    /// caller decides whether to roll back.
    pub fn commit(&self, tx_id: &TxId) -> TxResult<()> {
        // Hold the table lock across the whole commit so visibility flips
        // are serializable with respect to other commits and rollbacks.
        let mut table = self.table();
        let tx = table.get_mut(tx_id).ok_or(TxError::NotFound(*tx_id))?;
        if tx.state != TxState::Pending {
            return Err(TxError::InvalidState {
                tx_id: *tx_id,
                state: tx.state,
                required: "pending",
            });
        }

        tx.state = TxState::Committing;
        self.meta.set_tx_state(tx_id, TxState::Committing)?;

        let unmet = self.meta.unmet_dependencies(tx_id)?;
        if !unmet.is_empty() {
            warn!(tx = %tx_id, unmet = unmet.len(), "commit blocked on invisible parents");
            tx.state = TxState::Failed;
            self.meta.set_tx_state(tx_id, TxState::Failed)?;
            return Err(TxError::UnmetDependencies(unmet));
        }

        let assets = tx.assets.clone();
        self.meta.commit_tx(tx_id, &assets, Timestamp::now())?;
        table.remove(tx_id);
        debug!(tx = %tx_id, assets = assets.len(), "transaction committed");
        Ok(())
    }

    /// Roll back: remove tx-scoped rows; attached assets never become
    /// visible. Valid from `Pending` or `Failed`.
    pub fn rollback(&self, tx_id: &TxId) -> TxResult<()> {
        let mut table = self.table();
        let tx = table.get_mut(tx_id).ok_or(TxError::NotFound(*tx_id))?;
        if !matches!(tx.state, TxState::Pending | TxState::Failed) {
            return Err(TxError::InvalidState {
                tx_id: *tx_id,
                state: tx.state,
                required: "pending or failed",
            });
        }
        tx.state = TxState::RollingBack;
        self.meta.set_tx_state(tx_id, TxState::RollingBack)?;
        self.meta.rollback_tx(tx_id)?;
        table.remove(tx_id);
        Ok(())
    }

    /// Current state, consulting the durable record for transactions no
    /// longer active.
    pub fn state(&self, tx_id: &TxId) -> TxResult<TxState> {
        if let Some(tx) = self.table().get(tx_id) {
            return Ok(tx.state);
        }
        let record = self
            .meta
            .get_tx(tx_id)?
            .ok_or(TxError::NotFound(*tx_id))?;
        Ok(record.state)
    }

    /// Ids of transactions currently in the in-memory table.
    pub fn active_count(&self) -> usize {
        self.table().len()
    }

    /// Whether the given transaction exists and is still `Pending`.
    pub fn is_pending(&self, tx_id: &TxId) -> bool {
        self.table()
            .get(tx_id)
            .map(|tx| tx.state == TxState::Pending)
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TransactionManager(active={})", self.active_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use aifs_chunk::{ChunkCodec, ChunkRecord};
    use aifs_meta::AssetRecord;
    use aifs_types::AssetKind;

    fn setup() -> (Arc<MetaStore>, TransactionManager) {
        let meta = Arc::new(MetaStore::open_in_memory().unwrap());
        let mgr = TransactionManager::new(meta.clone());
        (meta, mgr)
    }

    fn insert_asset(meta: &MetaStore, data: &[u8], tx_id: TxId) -> AssetId {
        let chunk = ChunkRecord {
            hash: AssetId::from_bytes(data),
            size_plain: data.len() as u64,
            size_stored: data.len() as u64,
            codec: ChunkCodec::None,
            compression_level: 1,
            kms_key_id: "k".into(),
            wrapped_dek: "aa".into(),
            nonce: "00".repeat(12),
            aead_tag: "11".repeat(16),
        };
        let record = AssetRecord {
            asset_id: chunk.hash,
            kind: AssetKind::Blob,
            size: data.len() as u64,
            namespace: "ns".into(),
            metadata: BTreeMap::new(),
            created_at: Timestamp::now(),
            tx_id,
        };
        meta.insert_asset(&record, &[chunk]).unwrap();
        record.asset_id
    }

    #[test]
    fn begin_commit_makes_assets_visible() {
        let (meta, mgr) = setup();
        let tx = mgr.begin().unwrap();
        let asset = insert_asset(&meta, b"payload", tx);
        mgr.add_asset(&tx, asset).unwrap();

        assert!(!meta.is_visible(&asset).unwrap());
        mgr.commit(&tx).unwrap();
        assert!(meta.is_visible(&asset).unwrap());
        assert_eq!(mgr.state(&tx).unwrap(), TxState::Committed);
    }

    #[test]
    fn commit_fails_on_invisible_parent() {
        let (meta, mgr) = setup();

        // Parent is created but its transaction never commits.
        let parent_tx = mgr.begin().unwrap();
        let parent = insert_asset(&meta, b"parent", parent_tx);
        mgr.add_asset(&parent_tx, parent).unwrap();

        let child_tx = mgr.begin().unwrap();
        let child = insert_asset(&meta, b"child", child_tx);
        mgr.add_asset(&child_tx, child).unwrap();
        mgr.add_dependency(&child_tx, parent).unwrap();

        let err = mgr.commit(&child_tx).unwrap_err();
        assert!(matches!(err, TxError::UnmetDependencies(ref deps) if deps == &vec![parent]));
        assert_eq!(mgr.state(&child_tx).unwrap(), TxState::Failed);
        assert!(!meta.is_visible(&child).unwrap());
    }

    #[test]
    fn parent_then_child_commit_order_succeeds() {
        let (meta, mgr) = setup();
        let parent_tx = mgr.begin().unwrap();
        let parent = insert_asset(&meta, b"parent", parent_tx);
        mgr.add_asset(&parent_tx, parent).unwrap();

        let child_tx = mgr.begin().unwrap();
        let child = insert_asset(&meta, b"child", child_tx);
        mgr.add_asset(&child_tx, child).unwrap();
        mgr.add_dependency(&child_tx, parent).unwrap();

        mgr.commit(&parent_tx).unwrap();
        mgr.commit(&child_tx).unwrap();
        assert!(meta.is_visible(&parent).unwrap());
        assert!(meta.is_visible(&child).unwrap());

        // Parent committed no later than child (V2 + property 3).
        let parent_rec = meta.get_tx(&parent_tx).unwrap().unwrap();
        let child_rec = meta.get_tx(&child_tx).unwrap().unwrap();
        assert!(parent_rec.committed_at.unwrap() <= child_rec.committed_at.unwrap());
    }

    #[test]
    fn failed_tx_can_roll_back() {
        let (meta, mgr) = setup();
        let parent_tx = mgr.begin().unwrap();
        let parent = insert_asset(&meta, b"parent", parent_tx);
        mgr.add_asset(&parent_tx, parent).unwrap();

        let child_tx = mgr.begin().unwrap();
        let child = insert_asset(&meta, b"child", child_tx);
        mgr.add_asset(&child_tx, child).unwrap();
        mgr.add_dependency(&child_tx, parent).unwrap();

        assert!(mgr.commit(&child_tx).is_err());
        mgr.rollback(&child_tx).unwrap();
        assert_eq!(mgr.state(&child_tx).unwrap(), TxState::RolledBack);
        assert!(meta.get_asset(&child).unwrap().is_none());
    }

    #[test]
    fn rollback_leaves_no_visibility() {
        let (meta, mgr) = setup();
        let tx = mgr.begin().unwrap();
        let asset = insert_asset(&meta, b"doomed", tx);
        mgr.add_asset(&tx, asset).unwrap();
        mgr.rollback(&tx).unwrap();
        assert!(!meta.is_visible(&asset).unwrap());
        assert!(meta.get_asset(&asset).unwrap().is_none());
    }

    #[test]
    fn add_after_commit_rejected() {
        let (meta, mgr) = setup();
        let tx = mgr.begin().unwrap();
        let asset = insert_asset(&meta, b"a", tx);
        mgr.add_asset(&tx, asset).unwrap();
        mgr.commit(&tx).unwrap();

        let err = mgr.add_asset(&tx, AssetId::from_bytes(b"late")).unwrap_err();
        assert!(matches!(err, TxError::NotFound(_)));
    }

    #[test]
    fn double_commit_rejected() {
        let (_meta, mgr) = setup();
        let tx = mgr.begin().unwrap();
        mgr.commit(&tx).unwrap();
        assert!(matches!(mgr.commit(&tx).unwrap_err(), TxError::NotFound(_)));
    }

    #[test]
    fn rollback_of_committed_rejected() {
        let (_meta, mgr) = setup();
        let tx = mgr.begin().unwrap();
        mgr.commit(&tx).unwrap();
        assert!(mgr.rollback(&tx).is_err());
    }

    #[test]
    fn empty_commit_succeeds() {
        let (_meta, mgr) = setup();
        let tx = mgr.begin().unwrap();
        mgr.commit(&tx).unwrap();
        assert_eq!(mgr.state(&tx).unwrap(), TxState::Committed);
    }

    #[test]
    fn state_falls_back_to_durable_record() {
        let (_meta, mgr) = setup();
        let tx = mgr.begin().unwrap();
        mgr.commit(&tx).unwrap();
        assert_eq!(mgr.active_count(), 0);
        assert_eq!(mgr.state(&tx).unwrap(), TxState::Committed);
    }

    #[test]
    fn unknown_tx_not_found() {
        let (_meta, mgr) = setup();
        assert!(matches!(
            mgr.state(&TxId::new()).unwrap_err(),
            TxError::NotFound(_)
        ));
    }

    #[test]
    fn dependency_on_visible_parent_commits_directly() {
        let (meta, mgr) = setup();
        let parent_tx = mgr.begin().unwrap();
        let parent = insert_asset(&meta, b"parent", parent_tx);
        mgr.add_asset(&parent_tx, parent).unwrap();
        mgr.commit(&parent_tx).unwrap();

        let child_tx = mgr.begin().unwrap();
        let child = insert_asset(&meta, b"child", child_tx);
        mgr.add_asset(&child_tx, child).unwrap();
        mgr.add_dependency(&child_tx, parent).unwrap();
        mgr.commit(&child_tx).unwrap();
        assert!(meta.is_visible(&child).unwrap());
    }
}
