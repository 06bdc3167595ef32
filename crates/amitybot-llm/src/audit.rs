//! Audit records for LLM calls.
//! One entry per completion, emitted through `tracing` by the chat pipeline.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::backend::{LlmBackend, LlmResponse};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAuditEntry {
    pub id: Uuid,
    pub session_id: Option<String>,
    pub model: String,
    pub backend: String,
    pub role: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub output_hash: String,
    pub latency_ms: u64,
    pub called_at: chrono::DateTime<Utc>,
}

impl LlmAuditEntry {
    pub fn new(
        session_id: Option<String>,
        backend: &dyn LlmBackend,
        role: &str,
        response: &LlmResponse,
        latency_ms: u64,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(response.content.as_bytes());
        let output_hash = format!("{:x}", hasher.finalize());

        Self {
            id: Uuid::new_v4(),
            session_id,
            model: response.model.clone(),
            backend: backend.backend_name().to_string(),
            role: role.to_string(),
            prompt_tokens: response.prompt_tokens,
            completion_tokens: response.completion_tokens,
            output_hash,
            latency_ms,
            called_at: Utc::now(),
        }
    }

    /// Write the entry to the `llm_audit` tracing target.
    pub fn emit(&self) {
        tracing::info!(
            target: "llm_audit",
            id = %self.id,
            session_id = self.session_id.as_deref().unwrap_or("-"),
            model = %self.model,
            backend = %self.backend,
            role = %self.role,
            prompt_tokens = self.prompt_tokens,
            completion_tokens = self.completion_tokens,
            output_hash = %self.output_hash,
            latency_ms = self.latency_ms,
            "LLM call"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::OllamaBackend;

    #[test]
    fn test_output_hash_is_stable_sha256() {
        let backend = OllamaBackend::new("http://localhost:11434", "llama3:8b");
        let resp = LlmResponse {
            content: "hello".to_string(),
            model: "llama3:8b".to_string(),
            prompt_tokens: 5,
            completion_tokens: 1,
        };
        let entry = LlmAuditEntry::new(Some("s1".to_string()), &backend, "general", &resp, 42);
        assert_eq!(
            entry.output_hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(entry.backend, "ollama");
        assert_eq!(entry.latency_ms, 42);
    }
}
