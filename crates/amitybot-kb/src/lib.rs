//! amitybot-kb — Knowledge base for the AmityBot chat pipeline.
//! - Document loading from the data directory (txt, md, pdf)
//! - Text extraction for uploads (pdf via lopdf, images via OCR)
//! - Cleaning and recursive character splitting
//! - Embedding (local feature hashing or a remote embeddings API)
//! - Persisted vector store with cosine top-k search
//! - Full rebuilds of the index

pub mod error;
pub mod models;
pub mod extract;
pub mod loader;
pub mod cleaner;
pub mod splitter;
pub mod embedding;
pub mod store;
pub mod indexer;
pub mod upload;

pub use error::{KbError, Result};
pub use embedding::{build_embedder, Embedder, HashingEmbedder};
pub use indexer::{IndexReport, KbIndexer};
pub use models::{IndexedChunk, KbChunk, KbDocument, SearchHit};
pub use store::VectorStore;
pub use upload::{discard_upload, store_upload, StoredUpload, UploadKind};
