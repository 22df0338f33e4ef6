use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use aifs_types::{AssetId, DistanceMetric};

use crate::error::{IndexError, IndexResult};
use crate::metric::score;

/// One search result: asset id plus its score (smaller is closer).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub asset_id: AssetId,
    pub score: f32,
}

/// Introspection stats for one namespace index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceStats {
    pub namespace: String,
    pub dimension: usize,
    pub vector_count: usize,
}

#[derive(Serialize, Deserialize)]
struct NamespaceIndex {
    dimension: usize,
    metric: DistanceMetric,
    vectors: Vec<(AssetId, Vec<f32>)>,
}

impl NamespaceIndex {
    fn position(&self, asset_id: &AssetId) -> Option<usize> {
        self.vectors.iter().position(|(id, _)| id == asset_id)
    }
}

/// Vector index over all namespaces.
///
/// Adds and searches may run concurrently; a delete serializes with adds
/// for the same namespace through the write lock. When constructed with a
/// directory, each namespace persists to its own bincode file on
/// [`VectorIndex::flush`] and is reloaded on open.
pub struct VectorIndex {
    dir: Option<PathBuf>,
    namespaces: RwLock<HashMap<String, NamespaceIndex>>,
}

impl VectorIndex {
    /// Purely in-memory index.
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    /// Open a disk-backed index rooted at `dir`, loading any persisted
    /// namespace files.
    pub fn open(dir: impl Into<PathBuf>) -> IndexResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let mut namespaces = HashMap::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("idx") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let bytes = fs::read(&path)?;
            let index: NamespaceIndex = bincode::deserialize(&bytes)
                .map_err(|e| IndexError::Persistence(e.to_string()))?;
            debug!(namespace = name, vectors = index.vectors.len(), "index loaded");
            namespaces.insert(name.to_string(), index);
        }
        Ok(Self {
            dir: Some(dir),
            namespaces: RwLock::new(namespaces),
        })
    }

    /// Add (or replace) a vector for an asset.
    ///
    /// The first insert into a namespace fixes its dimension and metric;
    /// later inserts must match the dimension.
    pub fn add(
        &self,
        namespace: &str,
        asset_id: AssetId,
        vector: Vec<f32>,
        metric: DistanceMetric,
    ) -> IndexResult<()> {
        if vector.is_empty() {
            return Err(IndexError::EmptyVector);
        }
        let mut namespaces = self.namespaces.write().expect("index lock poisoned");
        let index = namespaces
            .entry(namespace.to_string())
            .or_insert_with(|| NamespaceIndex {
                dimension: vector.len(),
                metric,
                vectors: Vec::new(),
            });
        if vector.len() != index.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: index.dimension,
                actual: vector.len(),
            });
        }
        match index.position(&asset_id) {
            Some(pos) => index.vectors[pos].1 = vector,
            None => index.vectors.push((asset_id, vector)),
        }
        Ok(())
    }

    /// Best-first search, at most `k` hits.
    ///
    /// `admit` is consulted before scoring; the asset manager wires it to
    /// the visibility table and metadata filters, so non-visible or
    /// filtered-out assets never reach the scorer.
    pub fn search(
        &self,
        namespace: &str,
        query: &[f32],
        k: usize,
        admit: &dyn Fn(&AssetId) -> bool,
    ) -> IndexResult<Vec<SearchHit>> {
        let namespaces = self.namespaces.read().expect("index lock poisoned");
        let Some(index) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };
        if query.len() != index.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: index.dimension,
                actual: query.len(),
            });
        }

        let mut hits: Vec<SearchHit> = index
            .vectors
            .iter()
            .filter(|(id, _)| admit(id))
            .map(|(id, vector)| SearchHit {
                asset_id: *id,
                score: score(index.metric, query, vector),
            })
            .collect();
        hits.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    /// Remove a vector. Returns `true` if it was present.
    pub fn delete(&self, namespace: &str, asset_id: &AssetId) -> bool {
        let mut namespaces = self.namespaces.write().expect("index lock poisoned");
        let Some(index) = namespaces.get_mut(namespace) else {
            return false;
        };
        match index.position(asset_id) {
            Some(pos) => {
                index.vectors.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    /// The fixed dimension of a namespace, if it has one.
    pub fn dimension(&self, namespace: &str) -> Option<usize> {
        self.namespaces
            .read()
            .expect("index lock poisoned")
            .get(namespace)
            .map(|i| i.dimension)
    }

    /// Stats for every namespace.
    pub fn stats(&self) -> Vec<NamespaceStats> {
        let namespaces = self.namespaces.read().expect("index lock poisoned");
        let mut stats: Vec<NamespaceStats> = namespaces
            .iter()
            .map(|(name, index)| NamespaceStats {
                namespace: name.clone(),
                dimension: index.dimension,
                vector_count: index.vectors.len(),
            })
            .collect();
        stats.sort_by(|a, b| a.namespace.cmp(&b.namespace));
        stats
    }

    /// Persist every namespace to disk. No-op for in-memory indexes.
    pub fn flush(&self) -> IndexResult<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let namespaces = self.namespaces.read().expect("index lock poisoned");
        for (name, index) in namespaces.iter() {
            let bytes = bincode::serialize(index)
                .map_err(|e| IndexError::Persistence(e.to_string()))?;
            let path = dir.join(format!("{name}.idx"));
            let tmp = dir.join(format!("{name}.idx.tmp"));
            fs::write(&tmp, bytes)?;
            fs::rename(&tmp, &path)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.namespaces.read().expect("index lock poisoned").len();
        write!(f, "VectorIndex(namespaces={count})")
    }
}
