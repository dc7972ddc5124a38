//! Events that can occur in a conversation

use crate::menu::registry::normalize_command_name;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Callback button press; payload is the callback token
    Button,
    /// Free text message
    Text,
    /// Bot command such as `/start`
    Command,
}

/// Normalized incoming update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub conversation_id: String,
    /// Unique per update; used to reject duplicate deliveries
    pub event_id: String,
    pub kind: EventKind,
    pub payload: String,
}

impl Event {
    pub fn new(
        conversation_id: impl Into<String>,
        event_id: impl Into<String>,
        kind: EventKind,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            event_id: event_id.into(),
            kind,
            payload: payload.into(),
        }
    }

    pub fn button(conversation_id: &str, event_id: &str, token: &str) -> Self {
        Self::new(conversation_id, event_id, EventKind::Button, token)
    }

    pub fn text(conversation_id: &str, event_id: &str, text: &str) -> Self {
        Self::new(conversation_id, event_id, EventKind::Text, text)
    }

    pub fn command(conversation_id: &str, event_id: &str, command: &str) -> Self {
        Self::new(conversation_id, event_id, EventKind::Command, command)
    }
}

/// Split `/name@bot args` into the normalized name and the argument text
pub fn parse_command(payload: &str) -> (String, &str) {
    let payload = payload.trim_start();
    let (head, args) = payload
        .split_once(char::is_whitespace)
        .unwrap_or((payload, ""));
    (normalize_command_name(head), args.trim())
}
