//! HTTP handlers for all API routes.

pub mod system;
pub mod chat;
pub mod auth;
pub mod kb;
pub mod leads;
pub mod sync_logs;
