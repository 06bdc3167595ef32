//! Chat pipeline error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("Knowledge base error: {0}")]
    Kb(#[from] amitybot_kb::KbError),

    #[error("LLM error: {0}")]
    Llm(#[from] amitybot_llm::LlmError),

    #[error("CRM error: {0}")]
    Crm(#[from] amitybot_crm::CrmError),

    #[error("Prompt template error: {0}")]
    Template(#[from] minijinja::Error),
}
