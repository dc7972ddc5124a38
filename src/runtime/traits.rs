//! Trait abstractions for runtime I/O
//!
//! The render sink is the only outbound seam; tests swap in recording mocks.

use crate::render::{InlineButton, RenderPayload};
use crate::state_machine::MessageRef;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// What the messaging client should show in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderInstruction {
    pub conversation_id: String,
    /// HTML text
    pub text: String,
    pub buttons: Vec<Vec<InlineButton>>,
    /// Message to edit in place; a new message is sent when absent
    pub edit: Option<MessageRef>,
}

impl RenderInstruction {
    pub fn new(conversation_id: impl Into<String>, payload: RenderPayload, edit: Option<MessageRef>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            text: payload.text,
            buttons: payload.buttons,
            edit,
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    /// The message to edit is gone; the caller falls back to a fresh send
    #[error("Message {0} can no longer be edited")]
    MessageGone(MessageRef),
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Companion client of the update feed
#[async_trait]
pub trait RenderSink: Send + Sync {
    /// Send or edit a message, returning the reference of the shown message
    async fn deliver(&self, instruction: &RenderInstruction) -> Result<MessageRef, SinkError>;
}

#[async_trait]
impl<T: RenderSink + ?Sized> RenderSink for Arc<T> {
    async fn deliver(&self, instruction: &RenderInstruction) -> Result<MessageRef, SinkError> {
        (**self).deliver(instruction).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Sink that only logs what would be shown. Edits keep their reference,
/// sends get a fresh one.
#[derive(Debug, Default, Clone)]
pub struct LoggingSink;

#[async_trait]
impl RenderSink for LoggingSink {
    async fn deliver(&self, instruction: &RenderInstruction) -> Result<MessageRef, SinkError> {
        let message_ref = instruction
            .edit
            .clone()
            .unwrap_or_else(|| MessageRef::new(uuid::Uuid::new_v4().to_string()));
        tracing::info!(
            conv_id = %instruction.conversation_id,
            message_ref = %message_ref,
            edit = instruction.edit.is_some(),
            rows = instruction.buttons.len(),
            text = %instruction.text,
            "Render"
        );
        Ok(message_ref)
    }
}
