use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use aifs_types::{AssetId, AssetKind, SnapshotId, Timestamp, TxId};

/// Transaction lifecycle states.
///
/// `Committed` and `RolledBack` are terminal; `Failed` is terminal for the
/// commit attempt but the caller may still roll the transaction back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxState {
    Pending,
    Committing,
    Committed,
    RollingBack,
    RolledBack,
    Failed,
}

impl TxState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Committing => "committing",
            Self::Committed => "committed",
            Self::RollingBack => "rolling_back",
            Self::RolledBack => "rolled_back",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "committing" => Some(Self::Committing),
            "committed" => Some(Self::Committed),
            "rolling_back" => Some(Self::RollingBack),
            "rolled_back" => Some(Self::RolledBack),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether the state admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack)
    }
}

impl std::fmt::Display for TxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Durable transaction row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxRecord {
    pub tx_id: TxId,
    pub state: TxState,
    pub created_at: Timestamp,
    pub committed_at: Option<Timestamp>,
}

/// One stored asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetRecord {
    pub asset_id: AssetId,
    pub kind: AssetKind,
    pub size: u64,
    pub namespace: String,
    pub metadata: BTreeMap<String, String>,
    pub created_at: Timestamp,
    pub tx_id: TxId,
}

/// A lineage edge: `child` was produced from `parent` by `transform_name`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageEdge {
    pub child_id: AssetId,
    pub parent_id: AssetId,
    pub transform_name: Option<String>,
    pub transform_digest: Option<String>,
}

/// A signed snapshot row plus its sorted member ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub snapshot_id: SnapshotId,
    pub namespace: String,
    pub merkle_root: [u8; 32],
    pub timestamp: Timestamp,
    pub signature_hex: String,
    pub signer_pubkey_hex: String,
    pub metadata: BTreeMap<String, String>,
    /// Lexicographically sorted, distinct member asset ids.
    pub asset_ids: Vec<AssetId>,
}

/// A branch pointer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchRecord {
    pub name: String,
    pub namespace: String,
    pub snapshot_id: SnapshotId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub metadata: BTreeMap<String, String>,
}

/// One append-only branch history entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchHistoryRecord {
    pub name: String,
    pub namespace: String,
    pub old_snapshot_id: Option<SnapshotId>,
    pub new_snapshot_id: SnapshotId,
    pub at: Timestamp,
}

/// An immutable tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagRecord {
    pub name: String,
    pub namespace: String,
    pub snapshot_id: SnapshotId,
    pub created_at: Timestamp,
    pub metadata: BTreeMap<String, String>,
}

/// A namespace row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceRecord {
    pub name: String,
    pub metadata: BTreeMap<String, String>,
    pub created_at: Timestamp,
}

/// A registered per-namespace verification key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceKeyRecord {
    pub namespace: String,
    pub public_key_hex: String,
    pub created_at: Timestamp,
    pub metadata: BTreeMap<String, String>,
}

/// A pinned trusted key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrustedKeyRecord {
    pub key_id: String,
    pub public_key_hex: String,
    pub namespace: Option<String>,
    pub created_at: Timestamp,
    pub metadata: BTreeMap<String, String>,
}

/// Filter for asset listing.
#[derive(Clone, Debug, Default)]
pub struct AssetFilter {
    pub namespace: Option<String>,
    pub kind: Option<AssetKind>,
    pub limit: u32,
    /// Opaque continuation: the offset encoded by the previous page.
    pub cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_state_roundtrip() {
        for state in [
            TxState::Pending,
            TxState::Committing,
            TxState::Committed,
            TxState::RollingBack,
            TxState::RolledBack,
            TxState::Failed,
        ] {
            assert_eq!(TxState::parse(state.as_str()), Some(state));
        }
        assert_eq!(TxState::parse("bogus"), None);
    }

    #[test]
    fn terminal_states() {
        assert!(TxState::Committed.is_terminal());
        assert!(TxState::RolledBack.is_terminal());
        assert!(!TxState::Pending.is_terminal());
        assert!(!TxState::Failed.is_terminal());
    }
}
