//! Full knowledge-base rebuilds.
//!
//! A rebuild walks the data directory, cleans and splits every document,
//! embeds the chunks, persists the new index and then swaps it into the
//! shared store. The old index keeps serving searches until the swap.

use std::sync::Arc;
use std::time::Instant;

use amitybot_common::config::KbConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};

use crate::cleaner::clean_documents;
use crate::embedding::Embedder;
use crate::error::{KbError, Result};
use crate::loader::load_documents;
use crate::models::IndexedChunk;
use crate::splitter::TextSplitter;
use crate::store::VectorStore;

#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub documents: usize,
    pub chunks: usize,
    pub dimension: usize,
    pub duration_ms: u64,
    pub built_at: DateTime<Utc>,
}

pub struct KbIndexer {
    cfg: KbConfig,
    embedder: Arc<dyn Embedder>,
    store: Arc<RwLock<VectorStore>>,
    /// Serialises rebuilds; a second caller waits for the running one.
    lock: Mutex<()>,
}

impl KbIndexer {
    /// Create an indexer over the persisted store in `cfg.store_dir`.
    pub fn new(cfg: KbConfig, embedder: Arc<dyn Embedder>) -> Self {
        let store = VectorStore::load_or_empty(&cfg.store_dir, &embedder.id());
        Self::with_store(cfg, embedder, Arc::new(RwLock::new(store)))
    }

    pub fn with_store(
        cfg: KbConfig,
        embedder: Arc<dyn Embedder>,
        store: Arc<RwLock<VectorStore>>,
    ) -> Self {
        Self { cfg, embedder, store, lock: Mutex::new(()) }
    }

    pub fn store(&self) -> Arc<RwLock<VectorStore>> {
        Arc::clone(&self.store)
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    pub fn config(&self) -> &KbConfig {
        &self.cfg
    }

    pub fn is_running(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    /// Rebuild the whole index from `data_dir`.
    ///
    /// Fails with `NoDocuments` when nothing usable is found; the previous
    /// index stays in place.
    #[instrument(skip(self), fields(data_dir = %self.cfg.data_dir.display()))]
    pub async fn rebuild(&self) -> Result<IndexReport> {
        let _guard = self.lock.lock().await;
        let start = Instant::now();

        let data_dir = self.cfg.data_dir.clone();
        let store_dir = self.cfg.store_dir.clone();
        let min_chars = self.cfg.min_document_chars;

        let docs = tokio::task::spawn_blocking(move || -> Result<_> {
            std::fs::create_dir_all(&data_dir)?;
            std::fs::create_dir_all(&store_dir)?;
            let docs = load_documents(&data_dir)?;
            Ok(clean_documents(docs, min_chars))
        })
        .await??;

        if docs.is_empty() {
            warn!("No usable documents, keeping the current index");
            return Err(KbError::NoDocuments(self.cfg.data_dir.clone()));
        }

        let splitter = TextSplitter::new(self.cfg.chunk_size, self.cfg.chunk_overlap);
        let chunks = splitter.split_documents(&docs);
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(KbError::Embedding(format!(
                "expected {} vectors, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let indexed: Vec<IndexedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedChunk { chunk, embedding })
            .collect();
        let new_store = VectorStore::from_chunks(self.embedder.id(), indexed)?;

        let store_dir = self.cfg.store_dir.clone();
        let new_store = tokio::task::spawn_blocking(move || -> Result<VectorStore> {
            new_store.persist(&store_dir)?;
            Ok(new_store)
        })
        .await??;

        let report = IndexReport {
            documents: docs.len(),
            chunks: new_store.len(),
            dimension: new_store.dimension(),
            duration_ms: start.elapsed().as_millis() as u64,
            built_at: new_store.built_at().unwrap_or_else(Utc::now),
        };

        *self.store.write().await = new_store;

        info!(
            documents = report.documents,
            chunks = report.chunks,
            dimension = report.dimension,
            duration_ms = report.duration_ms,
            "Knowledge base rebuilt"
        );
        Ok(report)
    }
}
