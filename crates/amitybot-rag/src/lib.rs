//! amitybot-rag — the AmityBot chat pipeline.
//! - Retrieval over the knowledge-base vector store
//! - Prompt composition (system prompt, recent history, RAG template)
//! - Lead tool routing for logged-in users
//! - Per-session chat history

pub mod error;
pub mod prompt;
pub mod retriever;
pub mod chain;
pub mod sessions;

pub use chain::{ChatAnswer, RagChain, SourceDoc};
pub use error::{RagError, Result};
pub use retriever::Retriever;
pub use sessions::ChatSessions;
