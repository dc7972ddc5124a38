//! Pure state transition function
//!
//! Given the same state, registry and event, `transition` always produces the
//! same result and performs no I/O. Errors leave the input state untouched.

use super::event::parse_command;
use super::{ConversationState, Effect, Event, EventKind, StoredValue};
use crate::menu::{ButtonVariant, CallbackToken, CommandAction, MenuBody, MenuDefinition, Registry};
use crate::render::render;
use std::collections::BTreeSet;
use thiserror::Error;

/// Oldest entries are dropped past this depth
pub const MAX_HISTORY_DEPTH: usize = 256;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConversationState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Current menu is not registered: {0}")]
    UnknownMenu(String),
    #[error("Button token does not belong to the current menu: {token}")]
    StaleButton { token: String },
    #[error("No previous menu to go back to")]
    NoHistory,
    #[error("{0}")]
    ValidationFailed(String),
    #[error("Event already applied: {0}")]
    ReplayedEvent(String),
    #[error("Menu {0} does not handle this event")]
    Unhandled(String),
}

/// Pure transition function
pub fn transition(
    state: &ConversationState,
    registry: &Registry,
    event: &Event,
) -> Result<TransitionResult, TransitionError> {
    if state.has_applied(&event.event_id) {
        return Err(TransitionError::ReplayedEvent(event.event_id.clone()));
    }
    let current = resolve(registry, &state.current_menu_id)?;

    let mut next = state.clone();
    match event.kind {
        EventKind::Command => {
            let action = find_command(registry, current, &event.payload)
                .ok_or_else(|| TransitionError::Unhandled(current.id.clone()))?;
            apply_command(&mut next, registry, current, action)?;
        }
        EventKind::Button => {
            let variant = decode_button(current, &event.payload)?;
            apply_button(&mut next, registry, current, variant)?;
        }
        EventKind::Text => apply_text(&mut next, registry, current, &event.payload)?,
    }
    next.record_applied(&event.event_id);

    let menu = resolve(registry, &next.current_menu_id)?;
    let payload = render(menu, &next.collected, next.page_of(&menu.id), None);
    Ok(TransitionResult::new(next)
        .with_effect(Effect::PersistState)
        .with_effect(Effect::deliver(payload)))
}

fn resolve<'r>(registry: &'r Registry, menu_id: &str) -> Result<&'r MenuDefinition, TransitionError> {
    registry
        .resolve(menu_id)
        .map_err(|_| TransitionError::UnknownMenu(menu_id.to_string()))
}

/// Global commands win over the current menu's own commands
fn find_command<'r>(
    registry: &'r Registry,
    current: &'r MenuDefinition,
    payload: &str,
) -> Option<&'r CommandAction> {
    let (name, _args) = parse_command(payload);
    registry
        .command(&name)
        .or_else(|| current.commands.get(&name))
}

fn decode_button<'r>(current: &'r MenuDefinition, raw: &str) -> Result<&'r ButtonVariant, TransitionError> {
    CallbackToken::parse(raw)
        .filter(|token| token.tag == current.tag)
        .and_then(|token| current.button(token.index))
        .map(|button| &button.variant)
        .ok_or_else(|| TransitionError::StaleButton {
            token: raw.to_string(),
        })
}

fn apply_command(
    state: &mut ConversationState,
    registry: &Registry,
    current: &MenuDefinition,
    action: &CommandAction,
) -> Result<(), TransitionError> {
    match action {
        CommandAction::Press(variant) => apply_button(state, registry, current, variant),
        CommandAction::Restart(target) => {
            resolve(registry, target)?;
            state.history.clear();
            state.collected.clear();
            state.pages.clear();
            state.current_menu_id.clone_from(target);
            state.seed_current(registry);
            Ok(())
        }
    }
}

fn apply_button(
    state: &mut ConversationState,
    registry: &Registry,
    current: &MenuDefinition,
    variant: &ButtonVariant,
) -> Result<(), TransitionError> {
    match variant {
        ButtonVariant::Goto { target, value } => {
            if let Some(value) = value {
                state.collected.insert(current.id.clone(), value.clone());
            }
            navigate(state, registry, target)
        }
        ButtonVariant::Done { target: Some(target) } => navigate(state, registry, target),
        ButtonVariant::Back | ButtonVariant::Done { target: None } => go_back(state, registry),
        ButtonVariant::Cancel { target: None } => {
            state.collected.remove(&current.id);
            go_back(state, registry)
        }
        ButtonVariant::Cancel { target: Some(target) } => cancel_to(state, registry, target),
        ButtonVariant::ToggleOption { key } => {
            toggle(state, current, key);
            Ok(())
        }
        ButtonVariant::SelectOption { key } => {
            state
                .collected
                .insert(current.id.clone(), StoredValue::Selected(key.clone()));
            Ok(())
        }
        ButtonVariant::PrevPage => {
            let page = current.clamp_page(state.page_of(&current.id));
            set_page(state, current, page.saturating_sub(1));
            Ok(())
        }
        ButtonVariant::NextPage => {
            let page = current.clamp_page(state.page_of(&current.id));
            set_page(state, current, current.clamp_page(page + 1));
            Ok(())
        }
    }
}

/// The first page is not stored
fn set_page(state: &mut ConversationState, current: &MenuDefinition, page: usize) {
    if page == 0 {
        state.pages.remove(&current.id);
    } else {
        state.pages.insert(current.id.clone(), page);
    }
}

/// Move to `target`, remembering where we came from. Going to the current
/// menu again is a no-op.
fn navigate(state: &mut ConversationState, registry: &Registry, target: &str) -> Result<(), TransitionError> {
    resolve(registry, target)?;
    if state.current_menu_id == target {
        return Ok(());
    }
    let from = std::mem::replace(&mut state.current_menu_id, target.to_string());
    if state.history.last() != Some(&from) {
        state.history.push(from);
    }
    if state.history.len() > MAX_HISTORY_DEPTH {
        let excess = state.history.len() - MAX_HISTORY_DEPTH;
        state.history.drain(..excess);
    }
    state.seed_current(registry);
    Ok(())
}

fn go_back(state: &mut ConversationState, registry: &Registry) -> Result<(), TransitionError> {
    let previous = state.history.pop().ok_or(TransitionError::NoHistory)?;
    state.current_menu_id = previous;
    state.seed_current(registry);
    Ok(())
}

/// Unwind to `target`, keeping only the data of `target` and the menus
/// before it on the path. Everything entered since, side trips included, is
/// discarded. When the target is not on the path everything is discarded and
/// it becomes the new starting point.
fn cancel_to(state: &mut ConversationState, registry: &Registry, target: &str) -> Result<(), TransitionError> {
    resolve(registry, target)?;
    let pos = if state.current_menu_id == target {
        Some(state.history.len())
    } else {
        state.history.iter().rposition(|id| id == target)
    };
    if let Some(pos) = pos {
        state.history.truncate(pos);
        let kept: BTreeSet<&str> = state
            .history
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(target))
            .collect();
        state.collected.retain(|id, _| kept.contains(id.as_str()));
        state.pages.retain(|id, _| kept.contains(id.as_str()));
    } else {
        state.history.clear();
        state.collected.clear();
        state.pages.clear();
    }
    state.current_menu_id = target.to_string();
    state.seed_current(registry);
    Ok(())
}

fn toggle(state: &mut ConversationState, current: &MenuDefinition, key: &str) {
    let entry = state
        .collected
        .entry(current.id.clone())
        .or_insert_with(|| StoredValue::Checked(BTreeSet::new()));
    match entry {
        StoredValue::Checked(keys) => {
            if !keys.remove(key) {
                keys.insert(key.to_string());
            }
        }
        other => *other = StoredValue::Checked(BTreeSet::from([key.to_string()])),
    }
}

/// Text handling: global commands, then an exact callback token of the
/// current menu, then the menu's text rule
fn apply_text(
    state: &mut ConversationState,
    registry: &Registry,
    current: &MenuDefinition,
    input: &str,
) -> Result<(), TransitionError> {
    if input.starts_with('/') {
        if let Some(action) = find_command(registry, current, input) {
            return apply_command(state, registry, current, action);
        }
    }
    if let Ok(variant) = decode_button(current, input.trim()) {
        return apply_button(state, registry, current, variant);
    }

    let MenuBody::TextInput { rule, next } = &current.body else {
        return Err(TransitionError::Unhandled(current.id.clone()));
    };
    let value = rule.parse(input).map_err(TransitionError::ValidationFailed)?;
    state.collected.insert(current.id.clone(), value);

    match next {
        Some(target) => navigate(state, registry, target),
        None if !state.history.is_empty() => go_back(state, registry),
        None => Ok(()),
    }
}
