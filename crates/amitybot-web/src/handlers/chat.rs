//! Chat endpoint: validates the query and runs the RAG chain.

use amitybot_common::{ChatTurn, Role};
use amitybot_rag::SourceDoc;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
    /// Requested role; never more than the cookie session grants.
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub result: String,
    pub source_docs: Vec<SourceDoc>,
}

/// POST /chat
pub async fn chat(
    State(state): State<SharedState>,
    jar: CookieJar,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::from_rejection(e.status(), e.body_text()))?;

    let query = req.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Query cannot be empty".to_string()));
    }
    let max = state.config.rag.max_query_chars;
    if query.chars().count() > max {
        return Err(ApiError::BadRequest(format!("Query too long (max {max} characters)")));
    }

    let cookie_session = state.sessions.from_jar(&jar).await;
    let session_role = cookie_session.as_ref().map(|(_, d)| d.role()).unwrap_or_default();
    let role = req.role.unwrap_or(session_role).clamp_to(session_role);

    let session_id = req
        .session_id
        .filter(|s| !s.trim().is_empty())
        .or_else(|| cookie_session.as_ref().and_then(|(_, d)| d.chat_session_id.clone()))
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    if let Some((token, _)) = &cookie_session {
        state.sessions.set_chat_session(token, &session_id).await;
    }

    info!(session_id = %session_id, role = %role, "Chat request");
    let history = state.chat_sessions.history(&session_id, &req.chat_history).await;
    let answer = state.chain.answer(query, role, &history, Some(&session_id)).await;
    state
        .chat_sessions
        .append(&session_id, ChatTurn::new(query, answer.result.clone()))
        .await;

    Ok(Json(ChatResponse {
        session_id,
        result: answer.result,
        source_docs: answer.source_docs,
    }))
}
