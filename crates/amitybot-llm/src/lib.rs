//! amitybot-llm — LLM backend abstraction layer.
//! Implements the LlmBackend trait for OpenAI-compatible providers (Groq by
//! default), OpenAI and a local Ollama, plus call auditing.

pub mod backend;
pub mod audit;

pub use backend::{build_backend, LlmBackend, LlmError, LlmRequest, LlmResponse, Message};
pub use audit::LlmAuditEntry;
