//! Effects produced by state transitions

use crate::render::RenderPayload;

/// Effects to be executed after state transition, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Persist the new state
    PersistState,

    /// Show a menu to the user
    Deliver { payload: RenderPayload },
}

impl Effect {
    pub fn deliver(payload: RenderPayload) -> Self {
        Effect::Deliver { payload }
    }
}
