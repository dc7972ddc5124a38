//! Menu conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod recovery;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{Event, EventKind};
pub use recovery::{step, RecoveryReason, Step};
pub use state::{CollectedData, ConversationState, MessageRef, StoredValue};
pub use transition::{transition, TransitionError, TransitionResult};
