//! amitybot-crm — CRM access for AmityBot.
//! - `LeadRepository` trait and the in-memory CAM client
//! - Lead intent detection and markdown formatting for the chat lead tool
//! - Bounded log of knowledge-base sync jobs

pub mod error;
pub mod leads;
pub mod intent;
pub mod sync_log;

pub use error::{CrmError, Result};
pub use intent::{extract_lead_id, format_lead, is_lead_related_query};
pub use leads::{CamClient, Lead, LeadFilter, LeadRepository, LeadStatusUpdate};
pub use sync_log::{SyncJob, SyncLog, SyncOutcome, SyncStatus, SyncTrigger};
