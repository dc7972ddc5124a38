//! Conversation state types

use crate::menu::Registry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// How many applied event ids are remembered for replay detection.
///
/// A duplicate arriving after this many newer events of the same
/// conversation is no longer recognized and is applied again. Feeds with
/// monotonic numeric ids (Telegram's `update_id`) are also protected past
/// the window, see [`ConversationState::has_applied`].
pub const APPLIED_EVENTS_CAPACITY: usize = 64;

// ============================================================================
// Collected data
// ============================================================================

/// Value a menu contributed to the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StoredValue {
    /// Radio: key of the selected option
    Selected(String),
    /// Checkbox: keys of the checked options
    Checked(BTreeSet<String>),
    Text(String),
    Int(i64),
    Float(f64),
    /// Password input, never rendered in clear
    Secret(String),
}

/// Menu id -> value entered in that menu
pub type CollectedData = BTreeMap<String, StoredValue>;

/// Reference to a message delivered by the render sink, used for edits
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageRef(pub String);

impl MessageRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Conversation state
// ============================================================================

/// Everything remembered about one conversation between events
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationState {
    pub current_menu_id: String,
    /// Menus to return to, most recent last
    pub history: Vec<String>,
    pub collected: CollectedData,
    pub last_message_ref: Option<MessageRef>,
    /// Number of transitions applied
    pub version: u64,
    /// Recently applied event ids, oldest first
    pub applied_events: VecDeque<String>,
    /// Option page shown per menu; absent means the first page
    pub pages: BTreeMap<String, usize>,
}

impl ConversationState {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            current_menu_id: root.into(),
            history: Vec::new(),
            collected: CollectedData::new(),
            last_message_ref: None,
            version: 0,
            applied_events: VecDeque::new(),
            pages: BTreeMap::new(),
        }
    }

    /// Fresh state at the registry's root, with the root's defaults seeded
    pub fn at_root(registry: &Registry) -> Self {
        let mut state = Self::new(registry.root());
        state.seed_current(registry);
        state
    }

    /// Store the current menu's initial value unless it already has one
    pub(crate) fn seed_current(&mut self, registry: &Registry) {
        let Ok(menu) = registry.resolve(&self.current_menu_id) else {
            return;
        };
        if let Some(value) = menu.initial_value() {
            self.collected.entry(menu.id.clone()).or_insert(value);
        }
    }

    /// Whether `event_id` was already applied. Besides the remembered ids,
    /// a numeric id below the oldest remembered numeric id is treated as
    /// applied once the window is full.
    pub fn has_applied(&self, event_id: &str) -> bool {
        if self.applied_events.iter().any(|id| id == event_id) {
            return true;
        }
        if self.applied_events.len() < APPLIED_EVENTS_CAPACITY {
            return false;
        }
        let Ok(id) = event_id.parse::<u64>() else {
            return false;
        };
        self.applied_events
            .iter()
            .map(|known| known.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .ok()
            .and_then(|known| known.into_iter().min())
            .is_some_and(|oldest| id < oldest)
    }

    /// Page of `menu_id`'s option list last shown
    pub fn page_of(&self, menu_id: &str) -> usize {
        self.pages.get(menu_id).copied().unwrap_or_default()
    }

    /// Mark an event as applied and bump the version
    pub fn record_applied(&mut self, event_id: &str) {
        self.applied_events.push_back(event_id.to_string());
        while self.applied_events.len() > APPLIED_EVENTS_CAPACITY {
            self.applied_events.pop_front();
        }
        self.version += 1;
    }

    /// Drop collected data and history entries for menus the registry no
    /// longer knows. The current menu is left alone; an unknown current menu
    /// is handled by the transition. Returns whether anything changed.
    pub fn reconcile(&mut self, registry: &Registry) -> bool {
        let collected_before = self.collected.len();
        self.collected.retain(|id, _| registry.contains(id));
        let pages_before = self.pages.len();
        self.pages.retain(|id, _| registry.contains(id));

        let history_before = self.history.len();
        self.history.retain(|id| registry.contains(id));
        self.history.dedup();
        if self.history.last() == Some(&self.current_menu_id) {
            self.history.pop();
        }

        let pruned_collected = collected_before - self.collected.len();
        let pruned_history = history_before - self.history.len();
        let pruned_pages = pages_before - self.pages.len();
        if pruned_collected + pruned_history + pruned_pages > 0 {
            tracing::warn!(
                pruned_collected,
                pruned_history,
                "Pruned state for menus no longer registered"
            );
            true
        } else {
            false
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a stored state. Collected entries that no longer decode are
    /// dropped instead of failing the whole state.
    pub fn decode(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawState = serde_json::from_str(json)?;
        let mut collected = CollectedData::new();
        for (menu_id, value) in raw.collected {
            match serde_json::from_value::<StoredValue>(value) {
                Ok(value) => {
                    collected.insert(menu_id, value);
                }
                Err(e) => {
                    tracing::warn!(menu_id = %menu_id, error = %e, "Dropping undecodable collected value");
                }
            }
        }
        Ok(Self {
            current_menu_id: raw.current_menu_id,
            history: raw.history,
            collected,
            last_message_ref: raw.last_message_ref,
            version: raw.version,
            applied_events: raw.applied_events,
            pages: raw.pages,
        })
    }
}

/// Lenient on-disk shape of [`ConversationState`]
#[derive(Deserialize)]
struct RawState {
    current_menu_id: String,
    #[serde(default)]
    history: Vec<String>,
    #[serde(default)]
    collected: BTreeMap<String, Value>,
    #[serde(default)]
    last_message_ref: Option<MessageRef>,
    #[serde(default)]
    version: u64,
    #[serde(default)]
    applied_events: VecDeque<String>,
    #[serde(default)]
    pages: BTreeMap<String, usize>,
}
