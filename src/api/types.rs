//! API request and response types

use crate::state_machine::{ConversationState, Event, EventKind};
use serde::{Deserialize, Serialize};

/// Incoming update as posted by the feed adapter
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub conversation_id: String,
    /// Generated when the feed has no stable id of its own
    #[serde(default)]
    pub event_id: Option<String>,
    pub kind: EventKind,
    #[serde(default)]
    pub payload: String,
}

impl UpdateRequest {
    pub fn into_event(self) -> Result<Event, String> {
        if self.conversation_id.trim().is_empty() {
            return Err("conversation_id must not be empty".to_string());
        }
        let event_id = self
            .event_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Ok(Event::new(self.conversation_id, event_id, self.kind, self.payload))
    }
}

/// Stored state of one conversation
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation_id: String,
    pub state: ConversationState,
}

/// Registered menus
#[derive(Debug, Serialize)]
pub struct MenusResponse {
    pub root: String,
    pub menus: Vec<String>,
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
