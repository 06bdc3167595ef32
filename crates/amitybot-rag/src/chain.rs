//! The chat pipeline: lead tool or retrieval + LLM.
//!
//! `answer` never fails. Retrieval and LLM errors are logged and turned into
//! the fallback replies the chat widget shows verbatim.

use std::sync::Arc;
use std::time::Instant;

use amitybot_common::config::{LlmConfig, RagConfig};
use amitybot_common::{ChatTurn, Role};
use amitybot_crm::{extract_lead_id, format_lead, is_lead_related_query, CrmError, LeadRepository};
use amitybot_kb::SearchHit;
use amitybot_llm::{LlmAuditEntry, LlmBackend, LlmRequest, Message};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::error::Result;
use crate::prompt::PromptBuilder;
use crate::retriever::Retriever;

pub const EMPTY_QUESTION_REPLY: &str = "Please provide a valid question.";
pub const LLM_FAILURE_REPLY: &str = "Sorry, something went wrong with my response. Please try again.";
pub const PIPELINE_FAILURE_REPLY: &str =
    "I apologize, but I encountered an error while processing your question.";
pub const NO_CONTEXT: &str = "No specific information found in the database.";
pub const NO_LEAD_ID_REPLY: &str =
    "I couldn't find a lead ID in your question. Please provide a lead ID like 'lead #123' or just '123'.";

const PREVIEW_CHARS: usize = 200;

/// Citation for a chunk that was placed in the prompt context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDoc {
    pub source: String,
    pub chunk_index: usize,
    pub score: f32,
    pub preview: String,
}

impl From<&SearchHit> for SourceDoc {
    fn from(hit: &SearchHit) -> Self {
        Self {
            source: hit.source.clone(),
            chunk_index: hit.chunk_index,
            score: hit.score,
            preview: hit.content.chars().take(PREVIEW_CHARS).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatAnswer {
    pub result: String,
    pub source_docs: Vec<SourceDoc>,
}

impl ChatAnswer {
    fn text(result: impl Into<String>) -> Self {
        Self { result: result.into(), source_docs: Vec::new() }
    }
}

pub struct RagChain {
    llm: Arc<dyn LlmBackend>,
    retriever: Retriever,
    leads: Arc<dyn LeadRepository>,
    prompt: PromptBuilder,
    llm_cfg: LlmConfig,
    rag_cfg: RagConfig,
}

impl RagChain {
    pub fn new(
        llm: Arc<dyn LlmBackend>,
        retriever: Retriever,
        leads: Arc<dyn LeadRepository>,
        llm_cfg: LlmConfig,
        rag_cfg: RagConfig,
    ) -> Result<Self> {
        Ok(Self { llm, retriever, leads, prompt: PromptBuilder::new()?, llm_cfg, rag_cfg })
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer `query` for a caller with `role`, using the session `history`.
    #[instrument(skip(self, query, role, history), fields(role = %role, history = history.len()))]
    pub async fn answer(
        &self,
        query: &str,
        role: Role,
        history: &[ChatTurn],
        session_id: Option<&str>,
    ) -> ChatAnswer {
        let query = query.trim();
        if query.is_empty() {
            return ChatAnswer::text(EMPTY_QUESTION_REPLY);
        }
        info!(query = %query.chars().take(100).collect::<String>(), "Processing query");

        if role.is_privileged() && is_lead_related_query(query) {
            info!("Routing to lead tool");
            return ChatAnswer::text(self.lead_reply(query).await);
        }

        let hits = match self.retriever.retrieve(query, self.rag_cfg.retrieve_k).await {
            Ok(mut hits) => {
                hits.truncate(self.rag_cfg.docs_for(role));
                hits
            }
            Err(e) => {
                error!(error = %e, "Retrieval failed");
                return ChatAnswer::text(PIPELINE_FAILURE_REPLY);
            }
        };

        let context = build_context(&hits, self.rag_cfg.context_char_limit);
        let user_prompt = match self.prompt.render(&context, query) {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, "Prompt rendering failed");
                return ChatAnswer::text(PIPELINE_FAILURE_REPLY);
            }
        };

        let result = self.complete(self.messages(history, user_prompt), role, session_id).await;
        ChatAnswer { result, source_docs: hits.iter().map(SourceDoc::from).collect() }
    }

    async fn lead_reply(&self, query: &str) -> String {
        let Some(lead_id) = extract_lead_id(query) else {
            return NO_LEAD_ID_REPLY.to_string();
        };
        info!(lead_id = %lead_id, "Looking up lead");
        match self.leads.get(&lead_id).await {
            Ok(lead) => format_lead(&lead),
            Err(e @ CrmError::LeadNotFound(_)) => format!("❌ {e}"),
            Err(e) => {
                error!(lead_id = %lead_id, error = %e, "Lead lookup failed");
                format!("❌ An error occurred while retrieving lead information: {e}")
            }
        }
    }

    fn messages(&self, history: &[ChatTurn], user_prompt: String) -> Vec<Message> {
        let window = history.len().saturating_sub(self.rag_cfg.history_window);
        let mut messages = vec![Message::system(&self.llm_cfg.system_prompt)];
        for turn in &history[window..] {
            messages.push(Message::user(turn.query()));
            messages.push(Message::assistant(turn.answer()));
        }
        messages.push(Message::user(user_prompt));
        messages
    }

    async fn complete(&self, messages: Vec<Message>, role: Role, session_id: Option<&str>) -> String {
        let req = LlmRequest {
            messages,
            model: None,
            max_tokens: Some(self.llm_cfg.max_tokens),
            temperature: Some(self.llm_cfg.temperature),
            top_p: Some(self.llm_cfg.top_p),
        };

        let start = Instant::now();
        match self.llm.complete(req).await {
            Ok(resp) => {
                let latency_ms = start.elapsed().as_millis() as u64;
                LlmAuditEntry::new(
                    session_id.map(str::to_string),
                    self.llm.as_ref(),
                    role.as_str(),
                    &resp,
                    latency_ms,
                )
                .emit();
                resp.content
            }
            Err(e) => {
                warn!(error = %e, backend = self.llm.backend_name(), "LLM call failed");
                LLM_FAILURE_REPLY.to_string()
            }
        }
    }
}

/// Join chunk texts with blank lines, cut to `limit` chars plus `"..."`.
pub fn build_context(hits: &[SearchHit], limit: usize) -> String {
    let context = hits.iter().map(|h| h.content.as_str()).collect::<Vec<_>>().join("\n\n");
    if context.is_empty() {
        return NO_CONTEXT.to_string();
    }
    if context.chars().count() > limit {
        let mut cut: String = context.chars().take(limit).collect();
        cut.push_str("...");
        return cut;
    }
    context
}
