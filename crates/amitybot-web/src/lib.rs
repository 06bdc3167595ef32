//! amitybot-web — HTTP API for AmityBot.
//! Provides:
//!   - RAG chat with per-session history
//!   - Cookie sessions (login, logout, registration)
//!   - Knowledge-base upload and reindexing with a sync log
//!   - CRM lead lookup and status updates
//!   - Health checks and an SSE event stream

pub mod error;
pub mod handlers;
pub mod router;
pub mod session;
pub mod sse;
pub mod state;
pub mod users;
