//! CRM error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrmError>;

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("No lead found with ID: {0}")]
    LeadNotFound(String),

    #[error("Invalid lead status: {0}")]
    InvalidStatus(String),

    #[error("Sync job not found: {0}")]
    JobNotFound(uuid::Uuid),
}
