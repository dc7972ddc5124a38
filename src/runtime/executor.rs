//! Conversation runtime executor
//!
//! One runtime per conversation. Events are processed strictly one after the
//! other: load, step, then the effects in order (persist before deliver).

use super::traits::{RenderInstruction, RenderSink, SinkError};
use super::{DispatchError, DispatchOutcome};
use crate::menu::Registry;
use crate::render::RenderPayload;
use crate::state_machine::{step, ConversationState, Effect, Event, MessageRef, Step};
use crate::store::StateStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// An event plus the channel its outcome is reported on
pub(crate) struct Command {
    pub event: Event,
    pub reply: oneshot::Sender<Result<DispatchOutcome, DispatchError>>,
}

/// Generic conversation runtime that can work with any store and sink
pub struct ConversationRuntime<S, K>
where
    S: StateStore + 'static,
    K: RenderSink + 'static,
{
    conversation_id: String,
    registry: Arc<Registry>,
    store: S,
    sink: K,
    command_rx: mpsc::Receiver<Command>,
    idle_timeout: Duration,
    /// Runtime this one replaces; it finishes its queue before we start
    predecessor: Option<JoinHandle<()>>,
}

impl<S, K> ConversationRuntime<S, K>
where
    S: StateStore + 'static,
    K: RenderSink + 'static,
{
    pub(crate) fn new(
        conversation_id: impl Into<String>,
        registry: Arc<Registry>,
        store: S,
        sink: K,
        command_rx: mpsc::Receiver<Command>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            registry,
            store,
            sink,
            command_rx,
            idle_timeout,
            predecessor: None,
        }
    }

    #[must_use]
    pub(crate) fn after(mut self, predecessor: Option<JoinHandle<()>>) -> Self {
        self.predecessor = predecessor;
        self
    }

    /// Handle commands until every sender is gone or none arrives within the
    /// idle timeout
    pub async fn run(mut self) {
        if let Some(predecessor) = self.predecessor.take() {
            let _ = predecessor.await;
        }
        tracing::debug!(conv_id = %self.conversation_id, "Starting conversation runtime");

        loop {
            match tokio::time::timeout(self.idle_timeout, self.command_rx.recv()).await {
                Ok(Some(command)) => self.handle(command).await,
                Ok(None) => break,
                Err(_) => {
                    tracing::debug!(conv_id = %self.conversation_id, idle_secs = self.idle_timeout.as_secs(), "Conversation runtime idle");
                    // Refuse new commands but finish the ones already queued
                    self.command_rx.close();
                    while let Some(command) = self.command_rx.recv().await {
                        self.handle(command).await;
                    }
                    break;
                }
            }
        }

        tracing::debug!(conv_id = %self.conversation_id, "Conversation runtime stopped");
    }

    async fn handle(&self, Command { event, reply }: Command) {
        let result = self.process_event(&event).await;
        if let Err(e) = &result {
            tracing::error!(
                conv_id = %self.conversation_id,
                event_id = %event.event_id,
                error = %e,
                "Error handling event"
            );
        }
        // The dispatcher may have stopped waiting; the work is done either way
        let _ = reply.send(result);
    }

    async fn process_event(&self, event: &Event) -> Result<DispatchOutcome, DispatchError> {
        let (state, pruned) = self.load_state().await?;
        let Step {
            mut new_state,
            effects,
            recovered,
        } = step(&state, &self.registry, event);

        // Keep the store in line with the registry even when the event itself
        // changes nothing
        if pruned && !effects.iter().any(|e| matches!(e, Effect::PersistState)) {
            self.store.save(&self.conversation_id, &new_state).await?;
        }

        tracing::debug!(
            conv_id = %self.conversation_id,
            event_id = %event.event_id,
            kind = ?event.kind,
            menu_id = %new_state.current_menu_id,
            recovered = ?recovered,
            "Event processed"
        );

        let mut instruction = None;
        for effect in effects {
            match effect {
                Effect::PersistState => self.store.save(&self.conversation_id, &new_state).await?,
                Effect::Deliver { payload } => {
                    instruction = Some(self.deliver(&mut new_state, payload).await?);
                }
            }
        }

        Ok(DispatchOutcome {
            conversation_id: self.conversation_id.clone(),
            menu_id: new_state.current_menu_id,
            version: new_state.version,
            recovered,
            instruction,
        })
    }

    /// Stored state, or a fresh one at the root for new conversations, and
    /// whether entries for menus the registry no longer has were pruned
    async fn load_state(&self) -> Result<(ConversationState, bool), DispatchError> {
        let mut state = match self.store.load(&self.conversation_id).await? {
            Some(state) => state,
            None => {
                tracing::info!(conv_id = %self.conversation_id, root = %self.registry.root(), "Starting new conversation");
                ConversationState::at_root(&self.registry)
            }
        };
        let pruned = state.reconcile(&self.registry);
        Ok((state, pruned))
    }

    /// Show the payload, editing the last message when there is one. A new
    /// message reference is persisted right away so the next render edits it.
    async fn deliver(
        &self,
        state: &mut ConversationState,
        payload: RenderPayload,
    ) -> Result<RenderInstruction, DispatchError> {
        let mut instruction =
            RenderInstruction::new(&self.conversation_id, payload, state.last_message_ref.clone());

        let message_ref = match self.sink.deliver(&instruction).await {
            Ok(message_ref) => message_ref,
            Err(SinkError::MessageGone(gone)) => {
                tracing::warn!(conv_id = %self.conversation_id, message_ref = %gone, "Message to edit is gone, sending a new one");
                instruction.edit = None;
                self.sink.deliver(&instruction).await?
            }
            Err(e) => return Err(e.into()),
        };

        self.remember_message(state, message_ref).await?;
        Ok(instruction)
    }

    async fn remember_message(&self, state: &mut ConversationState, message_ref: MessageRef) -> Result<(), DispatchError> {
        if state.last_message_ref.as_ref() == Some(&message_ref) {
            return Ok(());
        }
        state.last_message_ref = Some(message_ref);
        self.store.save(&self.conversation_id, state).await?;
        Ok(())
    }
}
