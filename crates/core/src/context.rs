//! Conversation context: shape validation and the bounded history window.
//!
//! The service keeps no history between requests. Callers resend the context
//! they received last time; this module decides whether that payload is
//! usable and trims it so that at most `2 × depth` entries (user/bot pairs)
//! ever reach the model or go back to the caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::message::{Exchange, Role};

/// Returns true only if `value` is an array of `{"role", "content"}` objects
/// with no other keys, `role` in {"user", "bot"} and `content` a string.
///
/// The empty array is valid.
pub fn validate_context(value: &Value) -> bool {
    parse_entries(value).is_some()
}

/// Whole-context parse: a single bad element rejects everything.
fn parse_entries(value: &Value) -> Option<Vec<Exchange>> {
    value.as_array()?.iter().map(parse_exchange).collect()
}

fn parse_exchange(value: &Value) -> Option<Exchange> {
    let obj = value.as_object()?;
    if obj.len() != 2 {
        return None;
    }
    let role = Role::from_label(obj.get("role")?.as_str()?)?;
    let content = obj.get("content")?.as_str()?;
    Some(Exchange {
        role,
        content: content.to_string(),
    })
}

/// An ordered, oldest-first sequence of exchanges.
///
/// Serializes as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationContext {
    entries: Vec<Exchange>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from the raw request field.
    ///
    /// Missing or malformed input yields an empty context; nothing is
    /// recovered from a partially valid payload.
    pub fn from_value(value: Option<&Value>) -> Self {
        let Some(value) = value else {
            return Self::new();
        };
        if value.is_null() {
            return Self::new();
        }
        match parse_entries(value) {
            Some(entries) => Self { entries },
            None => {
                warn!("Invalid conversation context received, resetting to empty");
                Self::new()
            }
        }
    }

    pub fn entries(&self) -> &[Exchange] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, exchange: Exchange) {
        self.entries.push(exchange);
    }

    /// The most recent `2 × depth` entries, order preserved.
    ///
    /// Shorter contexts come back unchanged.
    pub fn windowed(&self, depth: usize) -> Self {
        Self {
            entries: window(&self.entries, depth).to_vec(),
        }
    }

    /// Trim in place to the most recent `2 × depth` entries.
    pub fn truncate_to_window(&mut self, depth: usize) {
        let limit = depth.saturating_mul(2);
        if self.entries.len() > limit {
            let excess = self.entries.len() - limit;
            self.entries.drain(..excess);
            debug!(dropped = excess, kept = limit, "Trimmed conversation context");
        }
    }

    /// Append the finished user/bot pair and re-apply the window bound.
    pub fn record_turn(
        &mut self,
        query: impl Into<String>,
        reply: impl Into<String>,
        depth: usize,
    ) {
        self.entries.push(Exchange::user(query));
        self.entries.push(Exchange::bot(reply));
        self.truncate_to_window(depth);
    }
}

impl From<Vec<Exchange>> for ConversationContext {
    fn from(entries: Vec<Exchange>) -> Self {
        Self { entries }
    }
}

/// Stable suffix-take of at most `2 × depth` entries.
pub fn window(entries: &[Exchange], depth: usize) -> &[Exchange] {
    let limit = depth.saturating_mul(2);
    let start = entries.len().saturating_sub(limit);
    &entries[start..]
}
