//! Data models for the knowledge base.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A loaded source document.
#[derive(Debug, Clone, PartialEq)]
pub struct KbDocument {
    /// Path relative to the data directory.
    pub source: String,
    pub text: String,
}

impl KbDocument {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self { source: source.into(), text: text.into() }
    }
}

/// A retrieval unit cut from a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbChunk {
    pub id: Uuid,
    pub source: String,
    pub chunk_index: usize,
    pub content: String,
}

/// A chunk with its embedding, as persisted in the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    #[serde(flatten)]
    pub chunk: KbChunk,
    pub embedding: Vec<f32>,
}

/// A search result, detached from the store.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: Uuid,
    pub source: String,
    pub chunk_index: usize,
    pub content: String,
    pub score: f32,
}
