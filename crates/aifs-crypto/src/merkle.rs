use serde::{Deserialize, Serialize};

use aifs_types::AssetId;

/// Side of a sibling in a Merkle proof path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Binary Merkle tree over asset ids.
///
/// Leaves are `BLAKE3(asset_id_bytes)`; internal nodes are
/// `BLAKE3(left || right)`. When a level has an odd node count the lone
/// node is carried up unchanged (no duplication). The root of the empty
/// set is `BLAKE3("")`.
///
/// Callers are expected to pass leaves sorted and deduplicated; the
/// snapshot layer owns that normalization.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    root: [u8; 32],
    leaves: Vec<AssetId>,
    /// All node hashes, level by level. Level 0 = hashed leaves.
    levels: Vec<Vec<[u8; 32]>>,
}

impl MerkleTree {
    /// Build a tree from asset ids.
    pub fn from_asset_ids(leaves: Vec<AssetId>) -> Self {
        if leaves.is_empty() {
            return Self {
                root: empty_root(),
                leaves,
                levels: vec![],
            };
        }

        let hashed: Vec<[u8; 32]> = leaves.iter().map(hash_leaf).collect();
        let mut levels: Vec<Vec<[u8; 32]>> = vec![hashed.clone()];
        let mut current = hashed;

        while current.len() > 1 {
            let mut next = Vec::with_capacity((current.len() + 1) / 2);
            for pair in current.chunks(2) {
                if pair.len() == 2 {
                    next.push(hash_pair(&pair[0], &pair[1]));
                } else {
                    // Odd node: carried up unchanged.
                    next.push(pair[0]);
                }
            }
            levels.push(next.clone());
            current = next;
        }

        Self {
            root: current[0],
            leaves,
            levels,
        }
    }

    /// The root hash.
    pub fn root(&self) -> [u8; 32] {
        self.root
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Generate an inclusion proof for the given asset id.
    pub fn proof_for(&self, asset_id: &AssetId) -> Option<MerkleProof> {
        let index = self.leaves.iter().position(|l| l == asset_id)?;
        self.proof(index)
    }

    /// Generate an inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaves.len() || self.levels.is_empty() {
            return None;
        }

        let mut path = Vec::new();
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_idx = if idx % 2 == 0 { idx + 1 } else { idx - 1 };
            if sibling_idx < level.len() {
                let side = if idx % 2 == 0 { Side::Right } else { Side::Left };
                path.push((level[sibling_idx], side));
            }
            // Lone node carried up: no sibling at this level.
            idx /= 2;
        }

        Some(MerkleProof {
            asset_id: self.leaves[index],
            path,
            leaf_count: self.leaves.len() as u64,
        })
    }
}

/// Merkle inclusion proof for one asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The asset being proven.
    pub asset_id: AssetId,
    /// Path of (sibling_hash, sibling_side) pairs from leaf to root.
    pub path: Vec<([u8; 32], Side)>,
    /// Number of leaves in the tree the proof was generated against.
    pub leaf_count: u64,
}

impl MerkleProof {
    /// Verify the proof against an expected root.
    ///
    /// Recomputes the root from `BLAKE3(asset_id)` and the sibling path.
    /// A path longer than `ceil(log2(leaf_count))` cannot come from a
    /// well-formed tree and is rejected outright.
    pub fn verify(&self, expected_root: &[u8; 32]) -> bool {
        if self.leaf_count == 0 {
            return false;
        }
        if self.path.len() > max_path_len(self.leaf_count) {
            return false;
        }
        let mut current = hash_leaf(&self.asset_id);
        for (sibling, side) in &self.path {
            current = match side {
                Side::Left => hash_pair(sibling, &current),
                Side::Right => hash_pair(&current, sibling),
            };
        }
        current == *expected_root
    }
}

fn hash_leaf(id: &AssetId) -> [u8; 32] {
    *blake3::hash(id.as_bytes()).as_bytes()
}

fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(left);
    hasher.update(right);
    *hasher.finalize().as_bytes()
}

fn empty_root() -> [u8; 32] {
    *blake3::hash(b"").as_bytes()
}

fn max_path_len(leaf_count: u64) -> usize {
    if leaf_count <= 1 {
        return 0;
    }
    // ceil(log2(n))
    (64 - (leaf_count - 1).leading_zeros()) as usize
}
