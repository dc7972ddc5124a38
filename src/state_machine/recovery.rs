//! Recovery policy for failed transitions
//!
//! `step` never fails: every [`TransitionError`] maps to a state and a set of
//! effects the runtime can execute.

use super::transition::{transition, TransitionError};
use super::{ConversationState, Effect, Event};
use crate::menu::Registry;
use crate::render::render;
use serde::Serialize;

/// Why a step did not apply the event normally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryReason {
    /// Button from an older render
    StaleButton,
    /// Back pressed with nothing to go back to
    NoHistory,
    /// Input rejected by the menu's text rule
    ValidationFailed,
    /// Event id already applied
    Replayed,
    /// Stored menu id is no longer registered; conversation restarted at root
    MenuReset,
    /// Event ignored by the current menu
    Ignored,
}

/// Outcome of processing one event
#[derive(Debug)]
pub struct Step {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
    pub recovered: Option<RecoveryReason>,
}

impl Step {
    fn applied(new_state: ConversationState, effects: Vec<Effect>) -> Self {
        Self {
            new_state,
            effects,
            recovered: None,
        }
    }

    fn recovered(new_state: ConversationState, effects: Vec<Effect>, reason: RecoveryReason) -> Self {
        Self {
            new_state,
            effects,
            recovered: Some(reason),
        }
    }

    /// Whether the step changes stored state
    pub fn persists(&self) -> bool {
        self.effects.iter().any(|e| matches!(e, Effect::PersistState))
    }
}

/// Apply `event`, falling back to the recovery policy when the transition fails
pub fn step(state: &ConversationState, registry: &Registry, event: &Event) -> Step {
    match transition(state, registry, event) {
        Ok(result) => Step::applied(result.new_state, result.effects),
        Err(error) => recover(state, registry, event, error),
    }
}

fn recover(state: &ConversationState, registry: &Registry, event: &Event, error: TransitionError) -> Step {
    let conv_id = &event.conversation_id;
    match error {
        TransitionError::StaleButton { token } => {
            tracing::debug!(conv_id = %conv_id, token = %token, "Stale button, re-rendering");
            rerender(state, registry, event, None, RecoveryReason::StaleButton)
        }
        TransitionError::NoHistory => {
            tracing::debug!(conv_id = %conv_id, "Back with empty history, re-rendering");
            rerender(state, registry, event, None, RecoveryReason::NoHistory)
        }
        TransitionError::ReplayedEvent(event_id) => {
            tracing::info!(conv_id = %conv_id, event_id = %event_id, "Replayed event, re-sending current menu");
            rerender(state, registry, event, None, RecoveryReason::Replayed)
        }
        TransitionError::ValidationFailed(message) => {
            tracing::debug!(conv_id = %conv_id, error = %message, "Input rejected");
            rerender(state, registry, event, Some(&message), RecoveryReason::ValidationFailed)
        }
        TransitionError::UnknownMenu(menu_id) => reset_to_root(state, registry, event, &menu_id),
        TransitionError::Unhandled(menu_id) => {
            tracing::debug!(conv_id = %conv_id, menu_id = %menu_id, kind = ?event.kind, "Event ignored");
            Step::recovered(state.clone(), vec![], RecoveryReason::Ignored)
        }
    }
}

/// Show the current menu again without touching state
fn rerender(
    state: &ConversationState,
    registry: &Registry,
    event: &Event,
    notice: Option<&str>,
    reason: RecoveryReason,
) -> Step {
    match registry.resolve(&state.current_menu_id) {
        Ok(menu) => {
            let payload = render(menu, &state.collected, state.page_of(&menu.id), notice);
            Step::recovered(state.clone(), vec![Effect::deliver(payload)], reason)
        }
        // Replays are detected before the current menu is resolved
        Err(_) => reset_to_root(state, registry, event, &state.current_menu_id),
    }
}

fn reset_to_root(state: &ConversationState, registry: &Registry, event: &Event, menu_id: &str) -> Step {
    tracing::error!(
        conv_id = %event.conversation_id,
        menu_id = %menu_id,
        root = %registry.root(),
        "Stored menu is not registered, restarting conversation at root"
    );
    let mut next = ConversationState::at_root(registry);
    next.last_message_ref.clone_from(&state.last_message_ref);
    next.version = state.version;
    next.applied_events.clone_from(&state.applied_events);
    if !next.has_applied(&event.event_id) {
        next.record_applied(&event.event_id);
    }

    let effects = match registry.resolve(&next.current_menu_id) {
        Ok(root) => vec![
            Effect::PersistState,
            Effect::deliver(render(root, &next.collected, 0, None)),
        ],
        Err(_) => vec![Effect::PersistState],
    };
    Step::recovered(next, effects, RecoveryReason::MenuReset)
}
