//! Button model and callback tokens

use super::definition::{Menu, MenuDecl};
use crate::state_machine::StoredValue;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DEFAULT_BACK_LABEL: &str = "« Back";
pub const DEFAULT_CANCEL_LABEL: &str = "Cancel";
pub const DEFAULT_DONE_LABEL: &str = "Done";
pub const PREV_PAGE_LABEL: &str = "‹ Prev";
pub const NEXT_PAGE_LABEL: &str = "Next ›";

/// What pressing a button does.
///
/// Whether a button keeps or discards collected data is decided by the tag
/// alone, see [`ButtonVariant::discards_data`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ButtonVariant {
    /// Navigate to another menu, pushing the current one onto the history.
    /// A `value` is stored for the menu the button was pressed in.
    Goto {
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<StoredValue>,
    },
    /// Return to the previous menu
    Back,
    /// Discard collected data, then go back (or unwind to `target`)
    Cancel { target: Option<String> },
    /// Keep collected data, then go back (or go to `target`)
    Done { target: Option<String> },
    /// Checkbox menus only
    ToggleOption { key: String },
    /// Radio menus only
    SelectOption { key: String },
    /// Paged option lists only
    PrevPage,
    NextPage,
}

impl ButtonVariant {
    pub fn discards_data(&self) -> bool {
        matches!(self, ButtonVariant::Cancel { .. })
    }

    /// Menu this button navigates to, if it names one
    pub fn target(&self) -> Option<&str> {
        match self {
            ButtonVariant::Goto { target, .. } => Some(target),
            ButtonVariant::Cancel { target } | ButtonVariant::Done { target } => target.as_deref(),
            _ => None,
        }
    }

    /// Whether this variant may be bound to a command (option and page
    /// buttons may not)
    pub fn is_navigation(&self) -> bool {
        !matches!(
            self,
            ButtonVariant::ToggleOption { .. }
                | ButtonVariant::SelectOption { .. }
                | ButtonVariant::PrevPage
                | ButtonVariant::NextPage
        )
    }
}

/// A fully resolved button as held by the registry
#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub label: String,
    pub variant: ButtonVariant,
}

impl Button {
    pub fn new(label: impl Into<String>, variant: ButtonVariant) -> Self {
        Self {
            label: label.into(),
            variant,
        }
    }
}

// ============================================================================
// Declaration surface
// ============================================================================

/// Factory producing a menu declaration; the Rust stand-in for a menu class
pub type MenuFactory = fn() -> MenuDecl;

/// Reference to a menu from inside another declaration
#[derive(Clone)]
pub enum MenuRef {
    /// A menu id or declared name
    Named(String),
    /// A declared menu type; registered automatically if nobody else did
    Declared(MenuFactory),
}

impl MenuRef {
    pub fn of<M: Menu>() -> Self {
        MenuRef::Declared(M::declare)
    }
}

impl std::fmt::Debug for MenuRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MenuRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
            MenuRef::Declared(factory) => f
                .debug_tuple("Declared")
                .field(&factory().name())
                .finish(),
        }
    }
}

impl From<&str> for MenuRef {
    fn from(name: &str) -> Self {
        MenuRef::Named(name.to_string())
    }
}

impl From<String> for MenuRef {
    fn from(name: String) -> Self {
        MenuRef::Named(name)
    }
}

/// A button as written by application code, normalized at registry build
#[derive(Debug, Clone)]
pub enum ButtonSpec {
    /// Go to the referenced menu, labelled with the target's title
    Menu(MenuRef),
    /// Go to the referenced menu with an explicit label, optionally storing
    /// a value for the menu it is pressed in
    Goto {
        label: String,
        target: MenuRef,
        value: Option<StoredValue>,
    },
    Back { label: String },
    Cancel { label: String, target: Option<MenuRef> },
    Done { label: String, target: Option<MenuRef> },
}

impl ButtonSpec {
    pub fn menu<M: Menu>() -> Self {
        ButtonSpec::Menu(MenuRef::of::<M>())
    }

    pub fn goto(label: impl Into<String>, target: impl Into<MenuRef>) -> Self {
        ButtonSpec::Goto {
            label: label.into(),
            target: target.into(),
            value: None,
        }
    }

    /// Like [`ButtonSpec::goto`], also recording `value` as the answer of the
    /// menu the button sits in
    pub fn goto_storing(
        label: impl Into<String>,
        target: impl Into<MenuRef>,
        value: StoredValue,
    ) -> Self {
        ButtonSpec::Goto {
            label: label.into(),
            target: target.into(),
            value: Some(value),
        }
    }

    pub fn back(label: impl Into<String>) -> Self {
        ButtonSpec::Back {
            label: label.into(),
        }
    }

    pub fn cancel(label: impl Into<String>) -> Self {
        ButtonSpec::Cancel {
            label: label.into(),
            target: None,
        }
    }

    pub fn cancel_to(label: impl Into<String>, target: impl Into<MenuRef>) -> Self {
        ButtonSpec::Cancel {
            label: label.into(),
            target: Some(target.into()),
        }
    }

    pub fn done(label: impl Into<String>) -> Self {
        ButtonSpec::Done {
            label: label.into(),
            target: None,
        }
    }

    pub fn done_to(label: impl Into<String>, target: impl Into<MenuRef>) -> Self {
        ButtonSpec::Done {
            label: label.into(),
            target: Some(target.into()),
        }
    }
}

/// Plain strings name a menu by id or declared name
impl From<&str> for ButtonSpec {
    fn from(name: &str) -> Self {
        ButtonSpec::Menu(MenuRef::from(name))
    }
}

impl From<MenuRef> for ButtonSpec {
    fn from(target: MenuRef) -> Self {
        ButtonSpec::Menu(target)
    }
}

// ============================================================================
// Callback tokens
// ============================================================================

const TAG_BYTES: usize = 6;
const TOKEN_SEPARATOR: char = ':';

/// Short, stable tag identifying a menu inside callback tokens.
///
/// Six bytes of SHA-256 encoded as URL-safe base64 (8 chars), so tokens stay
/// well inside Telegram's 64 byte `callback_data` limit regardless of how
/// long menu ids are.
pub fn menu_tag(menu_id: &str) -> String {
    let digest = Sha256::digest(menu_id.as_bytes());
    URL_SAFE_NO_PAD.encode(&digest[..TAG_BYTES])
}

/// Callback token: the menu's tag plus the index of the button in that menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackToken {
    pub tag: String,
    pub index: usize,
}

impl CallbackToken {
    pub fn new(tag: impl Into<String>, index: usize) -> Self {
        Self {
            tag: tag.into(),
            index,
        }
    }

    pub fn encode(&self) -> String {
        format!("{}{TOKEN_SEPARATOR}{}", self.tag, self.index)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let (tag, index) = raw.split_once(TOKEN_SEPARATOR)?;
        if tag.is_empty() {
            return None;
        }
        let index = index.parse().ok()?;
        Some(Self::new(tag, index))
    }
}
