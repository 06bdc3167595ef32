//! In-memory vector store persisted as a single JSON file.
//!
//! The whole index is rebuilt and replaced on every reindex, so the store is
//! immutable once built: readers share it behind an `RwLock` and the indexer
//! swaps in a new one.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{KbError, Result};
use crate::models::{IndexedChunk, SearchHit};

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStore {
    embedder_id: String,
    /// 0 for an empty store.
    dimension: usize,
    built_at: Option<DateTime<Utc>>,
    chunks: Vec<IndexedChunk>,
}

impl VectorStore {
    pub fn empty(embedder_id: impl Into<String>) -> Self {
        Self { embedder_id: embedder_id.into(), dimension: 0, built_at: None, chunks: Vec::new() }
    }

    /// Build a store; every embedding must have the same length.
    pub fn from_chunks(embedder_id: impl Into<String>, chunks: Vec<IndexedChunk>) -> Result<Self> {
        let dimension = chunks.first().map(|c| c.embedding.len()).unwrap_or(0);
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dimension) {
            return Err(KbError::InvalidEmbeddingDimension {
                expected: dimension,
                actual: bad.embedding.len(),
            });
        }
        Ok(Self {
            embedder_id: embedder_id.into(),
            dimension,
            built_at: Some(Utc::now()),
            chunks,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embedder_id(&self) -> &str {
        &self.embedder_id
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }

    /// Top-`k` chunks by cosine similarity, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if self.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(KbError::InvalidEmbeddingDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(f32, &IndexedChunk)> = self
            .chunks
            .iter()
            .map(|c| (cosine_similarity(query, &c.embedding), c))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, c)| SearchHit {
                id: c.chunk.id,
                source: c.chunk.source.clone(),
                chunk_index: c.chunk.chunk_index,
                content: c.chunk.content.clone(),
                score,
            })
            .collect())
    }

    pub fn index_path(dir: &Path) -> PathBuf {
        dir.join(INDEX_FILE)
    }

    /// Write `<dir>/index.json` through a temp file and rename.
    pub fn persist(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let path = Self::index_path(dir);
        let tmp = dir.join(format!("{INDEX_FILE}.tmp"));
        let bytes = serde_json::to_vec(self)?;
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;
        info!(path = %path.display(), chunks = self.len(), "Persisted vector store");
        Ok(())
    }

    /// `None` when no index has been written yet.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = Self::index_path(dir);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Load the persisted index, or start empty when it is missing, unreadable
    /// or was built by a different embedder.
    pub fn load_or_empty(dir: &Path, embedder_id: &str) -> Self {
        match Self::load(dir) {
            Ok(Some(store)) if store.embedder_id == embedder_id => {
                info!(chunks = store.len(), dimension = store.dimension, "Loaded vector store");
                store
            }
            Ok(Some(store)) => {
                warn!(
                    persisted = %store.embedder_id,
                    current = %embedder_id,
                    "Vector store was built by another embedder, ignoring it"
                );
                Self::empty(embedder_id)
            }
            Ok(None) => Self::empty(embedder_id),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Failed to load vector store, starting empty");
                Self::empty(embedder_id)
            }
        }
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KbChunk;
    use uuid::Uuid;

    fn chunk(source: &str, embedding: Vec<f32>) -> IndexedChunk {
        IndexedChunk {
            chunk: KbChunk {
                id: Uuid::new_v4(),
                source: source.to_string(),
                chunk_index: 0,
                content: format!("content of {source}"),
            },
            embedding,
        }
    }

    fn sample() -> VectorStore {
        VectorStore::from_chunks(
            "test",
            vec![
                chunk("x", vec![1.0, 0.0]),
                chunk("y", vec![0.0, 1.0]),
                chunk("xy", vec![0.7, 0.7]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_search_orders_by_score() {
        let hits = sample().search(&[1.0, 0.1], 3).unwrap();
        let sources: Vec<_> = hits.iter().map(|h| h.source.as_str()).collect();
        assert_eq!(sources, vec!["x", "xy", "y"]);
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_k_larger_than_store() {
        let hits = sample().search(&[0.0, 1.0], 10).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_dimension_mismatch_is_an_error() {
        let err = sample().search(&[1.0, 0.0, 0.0], 2).unwrap_err();
        assert!(matches!(err, KbError::InvalidEmbeddingDimension { expected: 2, actual: 3 }));
    }

    #[test]
    fn test_mixed_dimensions_are_rejected() {
        let res = VectorStore::from_chunks("test", vec![chunk("a", vec![1.0]), chunk("b", vec![1.0, 0.0])]);
        assert!(res.is_err());
    }

    #[test]
    fn test_empty_store_returns_nothing() {
        let store = VectorStore::empty("test");
        assert!(store.search(&[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_persist_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = sample();
        store.persist(dir.path()).unwrap();
        assert!(!dir.path().join("index.json.tmp").exists());

        let loaded = VectorStore::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.dimension(), 2);
        assert_eq!(loaded.embedder_id(), "test");
    }

    #[test]
    fn test_load_or_empty_discards_foreign_index() {
        let dir = tempfile::tempdir().unwrap();
        sample().persist(dir.path()).unwrap();
        assert_eq!(VectorStore::load_or_empty(dir.path(), "test").len(), 3);
        assert!(VectorStore::load_or_empty(dir.path(), "other").is_empty());
    }

    #[test]
    fn test_load_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        assert!(VectorStore::load(dir.path()).unwrap().is_none());
    }
}
