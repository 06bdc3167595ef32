//! HTTP error type. Every handler error renders as
//! `{"detail": "...", "status": "error"}` with the mapped status code.

use amitybot_crm::CrmError;
use amitybot_kb::KbError;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Map an extractor rejection, keeping 413 for oversized bodies.
    pub fn from_rejection(status: StatusCode, body_text: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(body_text)
        } else {
            ApiError::BadRequest(body_text)
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)      => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_)    => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_)        => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_)        => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match &self {
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                "Internal server error. Please try again later.".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "detail": detail, "status": "error" }))).into_response()
    }
}

impl From<KbError> for ApiError {
    fn from(err: KbError) -> Self {
        match err {
            KbError::UnsupportedFileType(_)
            | KbError::InvalidFileName(_)
            | KbError::NoTextExtracted(_)
            | KbError::NoDocuments(_)
            | KbError::DocumentTooShort { .. }
            | KbError::Pdf(_) => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CrmError> for ApiError {
    fn from(err: CrmError) -> Self {
        match err {
            CrmError::LeadNotFound(_)  => ApiError::NotFound(err.to_string()),
            CrmError::InvalidStatus(_) => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::from_rejection(err.status(), err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kb_errors_map_to_client_errors() {
        let err: ApiError = KbError::UnsupportedFileType(".exe".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Unsupported file type: .exe");

        let err: ApiError = KbError::Ocr("tesseract missing".into()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_no_documents_hides_server_path() {
        let err: ApiError = KbError::NoDocuments("/srv/amitybot/data".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "No documents to index");
    }

    #[test]
    fn test_unknown_lead_is_not_found() {
        let err: ApiError = CrmError::LeadNotFound("7".into()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
