//! Menu declarations and frozen menu definitions

use super::button::{Button, ButtonSpec, ButtonVariant, MenuRef, DEFAULT_BACK_LABEL};
use crate::state_machine::StoredValue;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Options shown per page unless a menu sets its own size
pub const DEFAULT_PAGE_SIZE: usize = 8;

/// A menu type. Implementors are referenced from other declarations with
/// [`ButtonSpec::menu`] / [`MenuRef::of`] and discovered by the registry.
pub trait Menu {
    fn declare() -> MenuDecl;
}

// ============================================================================
// Options and text rules
// ============================================================================

/// One entry of a Radio or Checkbox menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuOption {
    pub key: String,
    pub label: String,
    pub default_selected: bool,
}

impl MenuOption {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            default_selected: false,
        }
    }

    /// Mark this option as selected before the user touches the menu
    #[must_use]
    pub fn selected(mut self) -> Self {
        self.default_selected = true;
        self
    }
}

/// Plain strings are used as both key and label
impl From<&str> for MenuOption {
    fn from(label: &str) -> Self {
        MenuOption::new(label, label)
    }
}

pub type TextParser = fn(&str) -> Result<StoredValue, String>;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static TEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 ()\-]{2,24}$").expect("valid tel regex"));
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://[^\s/$.?#][^\s]*$").expect("valid url regex"));

/// How a text input menu parses and validates what the user typed
#[derive(Debug, Clone)]
pub enum TextRule {
    /// Any non-blank text, trimmed
    Text,
    Int,
    Float,
    /// Non-empty, stored as a secret and masked when rendered
    Password,
    Email,
    Tel,
    Url,
    /// Text matching the given pattern
    Pattern(Regex),
    Custom(TextParser),
}

impl TextRule {
    /// Parse user input into the value to store, or a message to show
    pub fn parse(&self, input: &str) -> Result<StoredValue, String> {
        let trimmed = input.trim();
        match self {
            TextRule::Text => {
                if trimmed.is_empty() {
                    return Err("Please enter some text.".to_string());
                }
                Ok(StoredValue::Text(trimmed.to_string()))
            }
            TextRule::Int => trimmed
                .parse::<i64>()
                .map(StoredValue::Int)
                .map_err(|_| "Please enter a whole number.".to_string()),
            TextRule::Float => trimmed
                .replace(',', ".")
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(StoredValue::Float)
                .ok_or_else(|| "Please enter a number.".to_string()),
            TextRule::Password => {
                if input.is_empty() {
                    return Err("The password must not be empty.".to_string());
                }
                Ok(StoredValue::Secret(input.to_string()))
            }
            TextRule::Email => Self::matching(&EMAIL_RE, trimmed, "Please enter a valid email address."),
            TextRule::Tel => Self::matching(&TEL_RE, trimmed, "Please enter a valid phone number."),
            TextRule::Url => Self::matching(&URL_RE, trimmed, "Please enter a valid http(s) URL."),
            TextRule::Pattern(re) => {
                Self::matching(re, trimmed, "The input does not have the expected format.")
            }
            TextRule::Custom(parser) => parser(input),
        }
    }

    fn matching(re: &Regex, text: &str, message: &str) -> Result<StoredValue, String> {
        if re.is_match(text) {
            Ok(StoredValue::Text(text.to_string()))
        } else {
            Err(message.to_string())
        }
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// What a global or menu-scoped command does, as declared
#[derive(Debug, Clone)]
pub enum CommandSpec {
    /// Behave like pressing the given button
    Press(ButtonSpec),
    /// Drop history and collected data, then show the menu
    Restart(MenuRef),
}

/// Kind-specific part of a declaration
#[derive(Debug, Clone)]
pub enum DeclBody {
    Goto(Vec<ButtonSpec>),
    Radio(Vec<MenuOption>),
    Checkbox(Vec<MenuOption>),
    TextInput {
        rule: TextRule,
        next: Option<MenuRef>,
    },
}

/// A menu as written by application code.
///
/// Built with the kind constructors and chained setters, then handed to a
/// [`RegistryBuilder`](super::RegistryBuilder) which validates and freezes it.
#[derive(Debug, Clone)]
pub struct MenuDecl {
    pub(crate) name: String,
    pub(crate) id: Option<String>,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) escape_title: bool,
    pub(crate) escape_description: bool,
    pub(crate) body: DeclBody,
    pub(crate) back: Option<ButtonSpec>,
    pub(crate) cancel: Option<ButtonSpec>,
    pub(crate) done: Option<ButtonSpec>,
    pub(crate) page_size: usize,
    pub(crate) commands: Vec<(String, CommandSpec)>,
}

impl MenuDecl {
    fn new(name: impl Into<String>, body: DeclBody) -> Self {
        // Goto menus list their own way out; the others get a default back button
        let back = match body {
            DeclBody::Goto(_) => None,
            _ => Some(ButtonSpec::back(DEFAULT_BACK_LABEL)),
        };
        Self {
            name: name.into(),
            id: None,
            title: String::new(),
            description: String::new(),
            escape_title: true,
            escape_description: true,
            body,
            back,
            cancel: None,
            done: None,
            page_size: DEFAULT_PAGE_SIZE,
            commands: Vec::new(),
        }
    }

    pub fn goto<B: Into<ButtonSpec>>(
        name: impl Into<String>,
        buttons: impl IntoIterator<Item = B>,
    ) -> Self {
        Self::new(
            name,
            DeclBody::Goto(buttons.into_iter().map(Into::into).collect()),
        )
    }

    pub fn radio<O: Into<MenuOption>>(
        name: impl Into<String>,
        options: impl IntoIterator<Item = O>,
    ) -> Self {
        Self::new(
            name,
            DeclBody::Radio(options.into_iter().map(Into::into).collect()),
        )
    }

    pub fn checkbox<O: Into<MenuOption>>(
        name: impl Into<String>,
        options: impl IntoIterator<Item = O>,
    ) -> Self {
        Self::new(
            name,
            DeclBody::Checkbox(options.into_iter().map(Into::into).collect()),
        )
    }

    pub fn text_input(name: impl Into<String>, rule: TextRule) -> Self {
        Self::new(name, DeclBody::TextInput { rule, next: None })
    }

    /// Override the derived id
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn escape_title(mut self, escape: bool) -> Self {
        self.escape_title = escape;
        self
    }

    #[must_use]
    pub fn escape_description(mut self, escape: bool) -> Self {
        self.escape_description = escape;
        self
    }

    #[must_use]
    pub fn back(mut self, button: impl Into<ButtonSpec>) -> Self {
        self.back = Some(button.into());
        self
    }

    #[must_use]
    pub fn without_back(mut self) -> Self {
        self.back = None;
        self
    }

    #[must_use]
    pub fn cancel(mut self, button: impl Into<ButtonSpec>) -> Self {
        self.cancel = Some(button.into());
        self
    }

    #[must_use]
    pub fn done(mut self, button: impl Into<ButtonSpec>) -> Self {
        self.done = Some(button.into());
        self
    }

    /// How many options of a Radio or Checkbox menu are shown at once.
    /// Longer lists get previous/next page buttons.
    #[must_use]
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Where a text input menu goes after a valid submission.
    /// Ignored for other kinds.
    #[must_use]
    pub fn next(mut self, target: impl Into<MenuRef>) -> Self {
        if let DeclBody::TextInput { next, .. } = &mut self.body {
            *next = Some(target.into());
        }
        self
    }

    /// A command only handled while this menu is current
    #[must_use]
    pub fn command(mut self, name: impl Into<String>, action: CommandSpec) -> Self {
        self.commands.push((name.into(), action));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The id this menu is registered under
    pub fn menu_id(&self) -> String {
        self.id.clone().unwrap_or_else(|| derive_menu_id(&self.name))
    }

    /// Every menu reference this declaration makes, in declaration order
    pub(crate) fn references(&self) -> Vec<&MenuRef> {
        let mut refs = Vec::new();
        if let DeclBody::Goto(buttons) = &self.body {
            refs.extend(buttons.iter().filter_map(spec_target));
        }
        if let DeclBody::TextInput { next: Some(next), .. } = &self.body {
            refs.push(next);
        }
        for slot in [&self.back, &self.cancel, &self.done].into_iter().flatten() {
            refs.extend(spec_target(slot));
        }
        for (_, action) in &self.commands {
            match action {
                CommandSpec::Press(spec) => refs.extend(spec_target(spec)),
                CommandSpec::Restart(target) => refs.push(target),
            }
        }
        refs
    }
}

pub(crate) fn spec_target(spec: &ButtonSpec) -> Option<&MenuRef> {
    match spec {
        ButtonSpec::Menu(target) | ButtonSpec::Goto { target, .. } => Some(target),
        ButtonSpec::Cancel { target, .. } | ButtonSpec::Done { target, .. } => target.as_ref(),
        ButtonSpec::Back { .. } => None,
    }
}

/// `TestCheckboxMenu` -> `TEST_CHECKBOX_MENU`
pub fn derive_menu_id(name: &str) -> String {
    use heck::ToShoutySnakeCase;
    name.to_shouty_snake_case()
}

// ============================================================================
// Frozen definitions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKind {
    Goto,
    Radio,
    Checkbox,
    TextInput,
}

/// Kind-specific part of a frozen definition
#[derive(Debug, Clone)]
pub enum MenuBody {
    Goto,
    Radio(Vec<MenuOption>),
    Checkbox(Vec<MenuOption>),
    TextInput {
        rule: TextRule,
        next: Option<String>,
    },
}

/// What a command does once resolved
#[derive(Debug, Clone, PartialEq)]
pub enum CommandAction {
    Press(ButtonVariant),
    Restart(String),
}

/// A validated menu, owned by the [`Registry`](super::Registry)
#[derive(Debug, Clone)]
pub struct MenuDefinition {
    pub id: String,
    pub name: String,
    /// Tag embedded in this menu's callback tokens
    pub tag: String,
    pub title: String,
    pub description: String,
    pub escape_title: bool,
    pub escape_description: bool,
    pub body: MenuBody,
    /// Every button of the menu. Body buttons (Goto entries or options) come
    /// first, then the back/cancel/done overrides; the position is the index
    /// used in callback tokens.
    pub buttons: Vec<Button>,
    /// Index of the first override button in `buttons`
    pub override_start: usize,
    /// Options shown per page
    pub page_size: usize,
    /// Index of the previous-page button in `buttons` (next-page follows it),
    /// present when the options do not fit on one page
    pub pager: Option<usize>,
    pub commands: BTreeMap<String, CommandAction>,
}

impl MenuDefinition {
    pub fn kind(&self) -> MenuKind {
        match self.body {
            MenuBody::Goto => MenuKind::Goto,
            MenuBody::Radio(_) => MenuKind::Radio,
            MenuBody::Checkbox(_) => MenuKind::Checkbox,
            MenuBody::TextInput { .. } => MenuKind::TextInput,
        }
    }

    pub fn options(&self) -> &[MenuOption] {
        match &self.body {
            MenuBody::Radio(options) | MenuBody::Checkbox(options) => options,
            _ => &[],
        }
    }

    pub fn option(&self, key: &str) -> Option<&MenuOption> {
        self.options().iter().find(|o| o.key == key)
    }

    pub fn button(&self, index: usize) -> Option<&Button> {
        self.buttons.get(index)
    }

    /// Number of option pages, at least one
    pub fn page_count(&self) -> usize {
        if self.pager.is_none() {
            return 1;
        }
        self.options().len().div_ceil(self.page_size.max(1)).max(1)
    }

    /// `page` clamped to the existing pages
    pub fn clamp_page(&self, page: usize) -> usize {
        page.min(self.page_count() - 1)
    }

    /// Indexes into `buttons` of the options shown on `page`
    pub fn page_range(&self, page: usize) -> std::ops::Range<usize> {
        if self.pager.is_none() {
            return 0..self.override_start;
        }
        let start = self.clamp_page(page) * self.page_size;
        start..(start + self.page_size).min(self.override_start)
    }

    /// Collected value a fresh visit starts with, if any
    pub fn initial_value(&self) -> Option<StoredValue> {
        match &self.body {
            MenuBody::Radio(options) => options
                .iter()
                .find(|o| o.default_selected)
                .map(|o| StoredValue::Selected(o.key.clone())),
            MenuBody::Checkbox(options) => Some(StoredValue::Checked(
                options
                    .iter()
                    .filter(|o| o.default_selected)
                    .map(|o| o.key.clone())
                    .collect(),
            )),
            _ => None,
        }
    }
}
