//! Conversation state types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// State key under which a conversation's history is stored
pub const HISTORY_KEY: &str = "echo_history";

/// Output used when an echo carries no usable input
pub const NO_INPUT_MESSAGE: &str = "EchoActor: Hello World! No input text to echo was provided!";

/// Prefix of every echoed output
pub const ECHO_PREFIX: &str = "EchoActor: ";

/// Acknowledgement returned by `Cancel`
pub const CANCEL_ACK: &str = "Cancel signal received";

// ============================================================================
// Identity
// ============================================================================

/// Opaque, non-blank key addressing one conversation and its actor
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConversationId(String);

/// Rejected conversation identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Missing mandatory conversation id in the input")]
pub struct InvalidConversationId;

impl ConversationId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidConversationId> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(InvalidConversationId);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Actor status
// ============================================================================

/// In-memory lifecycle of one live actor instance.
///
/// Never persisted: a fresh activation always starts `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorStatus {
    #[default]
    Active,
    Cancelled,
}

impl ActorStatus {
    pub fn is_cancelled(self) -> bool {
        matches!(self, ActorStatus::Cancelled)
    }
}

// ============================================================================
// Input / Turn / History
// ============================================================================

/// User input for an echo, keeping "absent" distinct from "blank"
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EchoInput {
    Present(String),
    #[default]
    Absent,
}

impl EchoInput {
    pub fn from_optional(input: Option<String>) -> Self {
        input.map_or(EchoInput::Absent, EchoInput::Present)
    }

    /// The input if it carries something other than whitespace
    pub fn meaningful(&self) -> Option<&str> {
        match self {
            EchoInput::Present(text) if !text.trim().is_empty() => Some(text),
            _ => None,
        }
    }
}

impl From<Option<String>> for EchoInput {
    fn from(input: Option<String>) -> Self {
        Self::from_optional(input)
    }
}

/// One input/output exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(alias = "user_input")]
    pub input: Option<String>,
    pub output: String,
    pub timestamp: DateTime<Utc>,
    pub actor_id: String,
}

/// Result of an echo: the new turn plus history as it was before it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoResponse {
    pub current: Turn,
    pub past: Vec<Turn>,
}

/// Outcome of deleting a conversation's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted { conversation_id: String },
    NothingToDelete { conversation_id: String },
}

impl fmt::Display for DeleteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteOutcome::Deleted { conversation_id } => {
                write!(f, "History was deleted successfully for {conversation_id}.")
            }
            DeleteOutcome::NothingToDelete { conversation_id } => {
                write!(f, "No history was found for {conversation_id}.")
            }
        }
    }
}

/// Encode a history into its stored form
pub fn encode_history(history: &[Turn]) -> Result<String, serde_json::Error> {
    serde_json::to_string(history)
}

/// Decode a stored history; one bad entry fails the whole read
pub fn decode_history(raw: &str) -> Result<Vec<Turn>, serde_json::Error> {
    serde_json::from_str(raw)
}
