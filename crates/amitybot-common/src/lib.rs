//! amitybot-common — Shared types, errors, and configuration used across all AmityBot crates.

pub mod error;
pub mod config;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::{AmityError, Result};
pub use models::{ChatTurn, Role};
