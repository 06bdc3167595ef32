//! Embedders turn chunk text into vectors for the store.
//!
//! Backends:
//!   HashingEmbedder  — local feature hashing (FNV-1a over word unigrams and
//!                      bigrams), no network, the default
//!   BackendEmbedder  — any `LlmBackend::embed` (Ollama, OpenAI-compatible)

use std::sync::Arc;

use amitybot_common::config::{EmbeddingBackendKind, EmbeddingConfig, LlmConfig, DEFAULT_OLLAMA_URL};
use amitybot_llm::backend::{LlmBackend, OllamaBackend, OpenAiCompatibleBackend};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::{debug, info, instrument};

use crate::error::{KbError, Result};

const BIGRAM_WEIGHT: f32 = 0.5;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts; one vector per input, in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut out = self.embed(&[text.to_string()]).await?;
        out.pop()
            .ok_or_else(|| KbError::Embedding("embedder returned no vector".to_string()))
    }

    /// Stable identifier; an index built by another embedder is discarded on load.
    fn id(&self) -> String;
}

/// Build the embedder selected in `[embedding]`.
///
/// The OpenAI-compatible backend falls back to the chat endpoint and key
/// from `[llm]` when no embedding base url is configured.
pub fn build_embedder(cfg: &EmbeddingConfig, llm: &LlmConfig) -> Arc<dyn Embedder> {
    let embedder: Arc<dyn Embedder> = match cfg.backend {
        EmbeddingBackendKind::Hashing => Arc::new(HashingEmbedder::new(cfg.dimension)),
        EmbeddingBackendKind::Ollama => {
            let url = cfg.base_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
            Arc::new(BackendEmbedder::new(
                Arc::new(OllamaBackend::new(url, &cfg.model)),
                cfg.batch_size,
            ))
        }
        EmbeddingBackendKind::OpenAiCompatible => {
            let url = cfg.base_url.as_deref().unwrap_or(llm.endpoint());
            let key = llm.api_key.as_ref().map(|k| k.expose_secret().to_string());
            let backend = OpenAiCompatibleBackend::new(url, &cfg.model, key)
                .with_embedding_model(&cfg.model);
            Arc::new(BackendEmbedder::new(Arc::new(backend), cfg.batch_size))
        }
    };
    info!(embedder = %embedder.id(), "Embedder ready");
    embedder
}

// ── Feature hashing ───────────────────────────────────────────────────────────

/// Deterministic bag-of-words embedder.
///
/// Each lowercased alphanumeric word (weight 1.0) and each adjacent word pair
/// (weight 0.5) is hashed into one of `dimension` buckets with a hash-derived
/// sign; the result is L2-normalised.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension: dimension.max(1) }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        let words = tokenize(text);

        for word in &words {
            self.add_feature(&mut v, word.as_bytes(), 1.0);
        }
        for pair in words.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.add_feature(&mut v, bigram.as_bytes(), BIGRAM_WEIGHT);
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }

    fn add_feature(&self, v: &mut [f32], bytes: &[u8], weight: f32) {
        let hash = fnv64(bytes);
        let bucket = (hash % self.dimension as u64) as usize;
        // top bit picks the sign so collisions tend to cancel
        let sign = if hash >> 63 == 1 { -1.0 } else { 1.0 };
        v[bucket] += sign * weight;
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn id(&self) -> String {
        format!("hashing-fnv1a-{}", self.dimension)
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// FNV-1a 64-bit hash.
fn fnv64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 14695981039346656037;
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    hash
}

// ── Remote embeddings ─────────────────────────────────────────────────────────

pub struct BackendEmbedder {
    backend: Arc<dyn LlmBackend>,
    batch_size: usize,
}

impl BackendEmbedder {
    pub fn new(backend: Arc<dyn LlmBackend>, batch_size: usize) -> Self {
        Self { backend, batch_size: batch_size.max(1) }
    }
}

#[async_trait]
impl Embedder for BackendEmbedder {
    #[instrument(skip(self, texts), fields(n = texts.len(), backend = self.backend.backend_name()))]
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let vectors = self.backend.embed(batch.to_vec()).await?;
            if vectors.len() != batch.len() {
                return Err(KbError::Embedding(format!(
                    "expected {} vectors, backend returned {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            debug!(batch = batch.len(), "Embedded batch");
            out.extend(vectors);
        }
        Ok(out)
    }

    fn id(&self) -> String {
        format!("{}:{}", self.backend.backend_name(), self.backend.model_id())
    }
}
