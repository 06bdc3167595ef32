//! Wire-level types shared between the chat pipeline and the web layer.

use serde::{Deserialize, Serialize};

/// Session role returned by `/check-session`.
///
/// Ordered so that `LoggedIn > General`; clamping a requested role to the
/// caller's session role is a `min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    General,
    LoggedIn,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::General  => "general",
            Role::LoggedIn => "logged_in",
        }
    }

    /// Privileged roles may use the admin endpoints and the lead tool.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::LoggedIn)
    }

    /// Never grant more than `ceiling`.
    pub fn clamp_to(self, ceiling: Role) -> Role {
        self.min(ceiling)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One exchange of a conversation: `(query, answer)`.
///
/// Serialised as a two-element array so clients can send `[["q", "a"], ...]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn(pub String, pub String);

impl ChatTurn {
    pub fn new(query: impl Into<String>, answer: impl Into<String>) -> Self {
        Self(query.into(), answer.into())
    }

    pub fn query(&self) -> &str {
        &self.0
    }

    pub fn answer(&self) -> &str {
        &self.1
    }
}
