//! Similarity retrieval over the shared vector store.

use std::sync::Arc;

use amitybot_kb::{Embedder, SearchHit, VectorStore};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::error::Result;

#[derive(Clone)]
pub struct Retriever {
    store: Arc<RwLock<VectorStore>>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(store: Arc<RwLock<VectorStore>>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Top-`k` chunks for `query`, best first. An empty store yields nothing.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if self.store.read().await.is_empty() {
            debug!("Vector store is empty");
            return Ok(Vec::new());
        }

        // no lock is held while embedding
        let vector = self.embedder.embed_query(query).await?;
        let hits = self.store.read().await.search(&vector, k)?;
        debug!(hits = hits.len(), "Retrieved chunks");
        Ok(hits)
    }

    pub async fn indexed_chunks(&self) -> usize {
        self.store.read().await.len()
    }
}
