//! Exchange and Role domain types.
//!
//! An [`Exchange`] is one turn of dialogue as the caller sees it on the wire:
//! `{"role": "user" | "bot", "content": "..."}`.

use serde::{Deserialize, Serialize};

/// Who produced an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The automated responder
    Bot,
}

impl Role {
    /// Parse the wire label. Only the two lowercase labels are accepted.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "user" => Some(Role::User),
            "bot" => Some(Role::Bot),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "bot",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single turn of dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    /// Who sent this turn
    pub role: Role,

    /// The text content
    pub content: String,
}

impl Exchange {
    /// Create a user exchange.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a bot exchange.
    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            content: content.into(),
        }
    }
}
