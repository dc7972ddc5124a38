//! SQLite-backed state store

use super::schema::{SCHEMA, SELECT_STATE, UPSERT_STATE};
use super::{decode_stored, StateStore, StoreError, StoreResult};
use crate::state_machine::ConversationState;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Thread-safe database handle
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("database lock poisoned".to_string()))
    }

    /// Number of stored conversations
    pub fn count(&self) -> StoreResult<u64> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM conversation_states", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn load(&self, conv_id: &str) -> StoreResult<Option<ConversationState>> {
        let conn = self.conn()?;
        let json: Option<String> = conn
            .query_row(SELECT_STATE, params![conv_id], |row| row.get(0))
            .optional()?;
        Ok(json.and_then(|json| decode_stored(conv_id, &json)))
    }

    async fn save(&self, conv_id: &str, state: &ConversationState) -> StoreResult<()> {
        let json = state.encode()?;
        let version = i64::try_from(state.version).unwrap_or(i64::MAX);
        let now = Utc::now().to_rfc3339();
        let conn = self.conn()?;
        conn.execute(
            UPSERT_STATE,
            params![conv_id, state.current_menu_id, version, json, now],
        )?;
        Ok(())
    }
}
