//! Conversation state storage
//!
//! Maps conversation ids to serialized [`ConversationState`]s. Backends:
//! an in-process map and SQLite.

mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::state_machine::ConversationState;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Could not encode state: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage for conversation state
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the state of a conversation, `None` if it never started
    async fn load(&self, conv_id: &str) -> StoreResult<Option<ConversationState>>;

    /// Replace the state of a conversation
    async fn save(&self, conv_id: &str, state: &ConversationState) -> StoreResult<()>;
}

#[async_trait]
impl<T: StateStore + ?Sized> StateStore for Arc<T> {
    async fn load(&self, conv_id: &str) -> StoreResult<Option<ConversationState>> {
        (**self).load(conv_id).await
    }

    async fn save(&self, conv_id: &str, state: &ConversationState) -> StoreResult<()> {
        (**self).save(conv_id, state).await
    }
}

/// Decode a stored state. A state that cannot be read at all is treated as
/// missing so the conversation restarts instead of failing forever.
fn decode_stored(conv_id: &str, json: &str) -> Option<ConversationState> {
    match ConversationState::decode(json) {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::warn!(conv_id = %conv_id, error = %e, "Discarding unreadable conversation state");
            None
        }
    }
}

/// In-process store; state is lost on restart
#[derive(Default, Clone)]
pub struct MemoryStore {
    states: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.states
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self, conv_id: &str) -> StoreResult<Option<ConversationState>> {
        let states = self.lock()?;
        Ok(states
            .get(conv_id)
            .and_then(|json| decode_stored(conv_id, json)))
    }

    async fn save(&self, conv_id: &str, state: &ConversationState) -> StoreResult<()> {
        let json = state.encode()?;
        self.lock()?.insert(conv_id.to_string(), json);
        Ok(())
    }
}
