//! CRM lead endpoints.

use amitybot_crm::{Lead, LeadFilter, LeadStatusUpdate};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::session::AdminSession;
use crate::state::{AppEvent, SharedState};

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// GET /leads?name=&status=&counselor=
pub async fn list_leads(
    _admin: AdminSession,
    State(state): State<SharedState>,
    Query(filter): Query<LeadFilter>,
) -> Result<Json<Vec<Lead>>, ApiError> {
    Ok(Json(state.leads.filter(&filter).await?))
}

/// GET /leads/{id}
pub async fn get_lead(
    _admin: AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Lead>, ApiError> {
    Ok(Json(state.leads.get(&id).await?))
}

/// POST /leads/{id}/status
pub async fn update_lead_status(
    _admin: AdminSession,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<LeadStatusUpdate>, ApiError> {
    let update = state
        .leads
        .update_status(&id, &req.status, req.notes.as_deref())
        .await?;
    state.emit(AppEvent::LeadUpdated {
        lead_id: update.id.clone(),
        old_status: update.old_status.clone(),
        new_status: update.new_status.clone(),
    });
    Ok(Json(update))
}
