//! Runtime for dispatching events to conversations
//!
//! The [`Dispatcher`] owns one [`ConversationRuntime`] task per active
//! conversation id. Events of one conversation are handled in arrival order;
//! different conversations run in parallel. A runtime that sees no event for
//! the idle timeout stops, and the next event for its conversation starts a
//! new one.

mod executor;
pub mod traits;


pub use executor::ConversationRuntime;
pub use traits::*;

use crate::menu::Registry;
use crate::state_machine::{Event, RecoveryReason};
use crate::store::{StateStore, StoreError};
use executor::Command;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;

/// Queue depth per conversation
const COMMAND_BUFFER: usize = 32;

/// How long a conversation runtime waits for its next event
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Dispatcher over trait objects, as used by the server
pub type SharedDispatcher = Dispatcher<Arc<dyn StateStore>, Arc<dyn RenderSink>>;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("Runtime for conversation {0} stopped")]
    RuntimeStopped(String),
}

/// What handling one event produced
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub conversation_id: String,
    /// Current menu after the event
    pub menu_id: String,
    pub version: u64,
    pub recovered: Option<RecoveryReason>,
    /// What was sent to the sink, if anything
    pub instruction: Option<RenderInstruction>,
}

/// Handle to a running conversation
struct ConversationHandle {
    command_tx: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

/// Manager for all conversation runtimes
pub struct Dispatcher<S, K> {
    registry: Arc<Registry>,
    store: S,
    sink: K,
    idle_timeout: Duration,
    runtimes: RwLock<HashMap<String, ConversationHandle>>,
}

impl<S, K> Dispatcher<S, K>
where
    S: StateStore + Clone + 'static,
    K: RenderSink + Clone + 'static,
{
    pub fn new(registry: Arc<Registry>, store: S, sink: K) -> Self {
        Self {
            registry,
            store,
            sink,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            runtimes: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Handle one event and wait for its outcome
    pub async fn dispatch(&self, event: Event) -> Result<DispatchOutcome, DispatchError> {
        let conv_id = event.conversation_id.clone();
        let command_tx = self.get_or_create(&conv_id).await;

        let (reply_tx, reply_rx) = oneshot::channel();
        let command = Command {
            event,
            reply: reply_tx,
        };
        if let Err(SendError(command)) = command_tx.send(command).await {
            // The runtime went idle between lookup and send; start a new one
            self.get_or_create(&conv_id)
                .await
                .send(command)
                .await
                .map_err(|_| DispatchError::RuntimeStopped(conv_id.clone()))?;
        }
        reply_rx
            .await
            .map_err(|_| DispatchError::RuntimeStopped(conv_id))?
    }

    /// Number of conversations with a live runtime. Handles of runtimes that
    /// have finished are dropped on the way.
    pub async fn active_conversations(&self) -> usize {
        let mut runtimes = self.runtimes.write().await;
        runtimes.retain(|_, handle| !handle.task.is_finished());
        runtimes
            .values()
            .filter(|handle| !handle.command_tx.is_closed())
            .count()
    }

    /// Get or create the runtime for a conversation
    async fn get_or_create(&self, conv_id: &str) -> mpsc::Sender<Command> {
        {
            let runtimes = self.runtimes.read().await;
            if let Some(handle) = runtimes.get(conv_id) {
                if !handle.command_tx.is_closed() {
                    return handle.command_tx.clone();
                }
            }
        }

        let mut runtimes = self.runtimes.write().await;
        // Another dispatch may have won the race while we waited for the lock
        if let Some(handle) = runtimes.get(conv_id) {
            if !handle.command_tx.is_closed() {
                return handle.command_tx.clone();
            }
        }
        let predecessor = runtimes.remove(conv_id).map(|handle| {
            tracing::debug!(conv_id = %conv_id, "Conversation runtime stopped, restarting");
            handle.task
        });
        runtimes.retain(|_, handle| !handle.task.is_finished());

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let runtime = ConversationRuntime::new(
            conv_id,
            Arc::clone(&self.registry),
            self.store.clone(),
            self.sink.clone(),
            command_rx,
            self.idle_timeout,
        )
        .after(predecessor);
        let task = tokio::spawn(runtime.run());

        runtimes.insert(
            conv_id.to_string(),
            ConversationHandle {
                command_tx: command_tx.clone(),
                task,
            },
        );
        command_tx
    }
}
