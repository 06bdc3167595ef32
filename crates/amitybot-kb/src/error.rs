//! Knowledge base error types.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, KbError>;

#[derive(Debug, Error)]
pub enum KbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("LLM backend error: {0}")]
    Llm(#[from] amitybot_llm::LlmError),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("No text could be extracted from {0}")]
    NoTextExtracted(String),

    #[error("Document too short to index: {chars} characters, at least {min} required")]
    DocumentTooShort { chars: usize, min: usize },

    /// Carries the scanned directory for logs; the message stays generic.
    #[error("No documents to index")]
    NoDocuments(PathBuf),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    InvalidEmbeddingDimension { expected: usize, actual: usize },

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for KbError {
    fn from(err: tokio::task::JoinError) -> Self {
        KbError::Task(err.to_string())
    }
}
