//! Database schema and types

use serde::Serialize;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS actor_state (
    actor_type TEXT NOT NULL,
    actor_id TEXT NOT NULL,
    state_key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    PRIMARY KEY (actor_type, actor_id, state_key)
);

CREATE INDEX IF NOT EXISTS idx_actor_state_actor ON actor_state(actor_type, actor_id);
";

/// Actor type that owns conversation history rows
pub const CONVERSATION_ACTOR_TYPE: &str = "EchoActor";

/// A single buffered mutation of actor state.
///
/// Changes are applied in one transaction by [`super::Database::apply_changes`],
/// so a batch either lands completely or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    Upsert { key: String, value: String },
    Remove { key: String },
}

/// Stored state row
#[derive(Debug, Clone, Serialize)]
pub struct StateRecord {
    pub actor_id: String,
    pub key: String,
    pub value: String,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
