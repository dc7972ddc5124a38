//! SQLite schema for conversation state

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS conversation_states (
    conversation_id TEXT PRIMARY KEY,
    current_menu_id TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 0,
    state TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversation_states_updated ON conversation_states(updated_at DESC);
";

/// Insert or replace a conversation's state, keeping `created_at`
pub const UPSERT_STATE: &str = "
INSERT INTO conversation_states (conversation_id, current_menu_id, version, state, created_at, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?5)
ON CONFLICT(conversation_id) DO UPDATE SET
    current_menu_id = excluded.current_menu_id,
    version = excluded.version,
    state = excluded.state,
    updated_at = excluded.updated_at
";

pub const SELECT_STATE: &str =
    "SELECT state FROM conversation_states WHERE conversation_id = ?1";
