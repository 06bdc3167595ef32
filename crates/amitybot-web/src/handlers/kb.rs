//! Knowledge-base upload and reindex endpoints.

use amitybot_crm::SyncTrigger;
use amitybot_kb::{discard_upload, store_upload, KbError};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::error::ApiError;
use crate::session::AdminSession;
use crate::state::{AppEvent, SharedState};

/// POST /kb-upload: store the `file` field, then rebuild the index.
pub async fn kb_upload(
    _admin: AdminSession,
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Uploaded file has no name".to_string()))?;
        let bytes = field.bytes().await?;
        upload = Some((file_name, bytes));
        break;
    }
    let (file_name, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }

    let stored = store_upload(&state.config.kb, &file_name, &bytes).await?;
    state.emit(AppEvent::FileUploaded {
        file: stored.original_name.clone(),
        chars: stored.extracted_chars,
    });

    let report = match state.reindex(SyncTrigger::Upload).await.result {
        Ok(report) => report,
        Err(e) => {
            error!(file = %stored.original_name, error = %e, "Reindex after upload failed");
            discard_upload(&stored).await;
            return Err(e.into());
        }
    };
    info!(file = %stored.original_name, chunks = report.chunks, "Upload indexed");

    Ok(Json(json!({
        "message": "File uploaded and KB reindexed.",
        "file": stored.original_name,
        "kind": stored.kind,
        "chunks": report.chunks,
    })))
}

/// POST /reindex
pub async fn reindex(_admin: AdminSession, State(state): State<SharedState>) -> Response {
    let run = state.reindex(SyncTrigger::Manual).await;
    match run.result {
        Ok(report) => Json(json!({
            "status": "success",
            "message": "Reindexing complete",
            "job_id": run.job_id,
            "documents": report.documents,
            "chunks": report.chunks,
        }))
        .into_response(),
        Err(e) => {
            let status = match e {
                KbError::NoDocuments(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error!(job_id = %run.job_id, error = %e, "Reindex failed");
            (
                status,
                Json(json!({
                    "status": "error",
                    "message": e.to_string(),
                    "job_id": run.job_id,
                })),
            )
                .into_response()
        }
    }
}
