//! Knowledge-base sync job history.

use amitybot_crm::SyncJob;
use axum::{extract::State, Json};

use crate::session::AdminSession;
use crate::state::SharedState;

/// GET /sync-logs, newest first.
pub async fn list_sync_logs(_admin: AdminSession, State(state): State<SharedState>) -> Json<Vec<SyncJob>> {
    Json(state.sync_log.list().await)
}
