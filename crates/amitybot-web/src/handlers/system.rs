//! Liveness and health endpoints.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::SharedState;

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Amity Bot API is running", "status": "healthy" }))
}

/// GET /health
pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    let chunks = state.indexer.store().read().await.len();
    let crm = state.leads.health_check().await;

    Json(json!({
        "status": "healthy",
        "service": "Amity Bot API",
        "version": env!("CARGO_PKG_VERSION"),
        "components": {
            "vector_store_chunks": chunks,
            "crm": crm,
            "llm_configured": state.llm_configured,
            "reindex_running": state.indexer.is_running(),
        }
    }))
}
