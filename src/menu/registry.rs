//! Menu registry
//!
//! Built once at startup from declarations (build -> freeze -> serve) and
//! shared immutably afterwards.

use super::button::{
    menu_tag, Button, ButtonSpec, ButtonVariant, MenuRef, NEXT_PAGE_LABEL, PREV_PAGE_LABEL,
};
use super::definition::{
    CommandAction, CommandSpec, DeclBody, Menu, MenuBody, MenuDecl, MenuDefinition, MenuOption,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Menu id already registered: {0}")]
    DuplicateMenuId(String),
    #[error("Unknown menu: {0}")]
    UnknownMenu(String),
    #[error("Menu name {0} is declared more than once; refer to it by id")]
    AmbiguousMenuName(String),
    #[error("Root menu is not registered: {0}")]
    MissingRoot(String),
    #[error("Invalid menu {menu}: {reason}")]
    InvalidMenu { menu: String, reason: String },
    #[error("Callback token tag {tag} is shared by {first} and {second}")]
    TokenCollision {
        tag: String,
        first: String,
        second: String,
    },
}

/// Collects declarations and global commands, then validates and freezes them
pub struct RegistryBuilder {
    root: MenuRef,
    decls: Vec<MenuDecl>,
    ids: HashSet<String>,
    commands: Vec<(String, CommandSpec)>,
}

impl RegistryBuilder {
    pub fn new(root: impl Into<MenuRef>) -> Self {
        Self {
            root: root.into(),
            decls: Vec::new(),
            ids: HashSet::new(),
            commands: Vec::new(),
        }
    }

    /// Add a declaration. Fails if its id is already taken.
    pub fn register(&mut self, decl: MenuDecl) -> Result<(), RegistryError> {
        let id = decl.menu_id();
        if !self.ids.insert(id.clone()) {
            return Err(RegistryError::DuplicateMenuId(id));
        }
        tracing::debug!(menu_id = %id, name = %decl.name(), "Registered menu");
        self.decls.push(decl);
        Ok(())
    }

    pub fn register_menu<M: Menu>(&mut self) -> Result<(), RegistryError> {
        self.register(M::declare())
    }

    /// A command handled regardless of the current menu
    pub fn command(&mut self, name: impl AsRef<str>, action: CommandSpec) {
        self.commands
            .push((normalize_command_name(name.as_ref()), action));
    }

    /// Validate every declaration and freeze the registry
    pub fn build(mut self) -> Result<Registry, RegistryError> {
        self.discover()?;

        let index = DeclIndex::new(&self.decls);
        let root = index.resolve(&self.root).map_err(|e| match e {
            RegistryError::UnknownMenu(name) => RegistryError::MissingRoot(name),
            other => other,
        })?;

        let mut menus = HashMap::with_capacity(self.decls.len());
        let mut tags: HashMap<String, String> = HashMap::new();
        for decl in &self.decls {
            let definition = index.freeze(decl)?;
            if let Some(first) = tags.insert(definition.tag.clone(), definition.id.clone()) {
                return Err(RegistryError::TokenCollision {
                    tag: definition.tag,
                    first,
                    second: definition.id,
                });
            }
            menus.insert(definition.id.clone(), definition);
        }

        let mut commands = BTreeMap::new();
        for (name, spec) in &self.commands {
            commands.insert(name.clone(), index.command("<global>", spec)?);
        }

        tracing::info!(menus = menus.len(), root = %root, "Menu registry built");
        Ok(Registry {
            menus,
            root,
            commands,
        })
    }

    /// Auto-register menu types referenced from the root, global commands and
    /// any registered declaration, transitively. Cycles end because a menu is
    /// only adopted once per id.
    fn discover(&mut self) -> Result<(), RegistryError> {
        let seeds: Vec<MenuDecl> = std::iter::once(&self.root)
            .chain(self.commands.iter().filter_map(|(_, spec)| match spec {
                CommandSpec::Press(spec) => super::definition::spec_target(spec),
                CommandSpec::Restart(target) => Some(target),
            }))
            .filter_map(declared)
            .collect();
        for decl in seeds {
            self.adopt(decl)?;
        }

        let mut cursor = 0;
        while cursor < self.decls.len() {
            let found: Vec<MenuDecl> = self.decls[cursor]
                .references()
                .into_iter()
                .filter_map(declared)
                .collect();
            cursor += 1;
            for decl in found {
                self.adopt(decl)?;
            }
        }
        Ok(())
    }

    /// Register a referenced menu type unless it is already known. An id
    /// taken by a differently named declaration is a conflict.
    fn adopt(&mut self, decl: MenuDecl) -> Result<(), RegistryError> {
        let id = decl.menu_id();
        if self.ids.insert(id.clone()) {
            tracing::debug!(menu_id = %id, "Auto-registered referenced menu");
            self.decls.push(decl);
            return Ok(());
        }
        let same = self
            .decls
            .iter()
            .any(|known| known.menu_id() == id && known.name() == decl.name());
        if same {
            Ok(())
        } else {
            Err(RegistryError::DuplicateMenuId(id))
        }
    }
}

fn declared(target: &MenuRef) -> Option<MenuDecl> {
    match target {
        MenuRef::Declared(factory) => Some(factory()),
        MenuRef::Named(_) => None,
    }
}

/// `/Start@SomeBot` -> `start`
pub fn normalize_command_name(name: &str) -> String {
    let name = name.trim().trim_start_matches('/');
    let name = name.split_once('@').map_or(name, |(command, _bot)| command);
    name.to_lowercase()
}

/// Lookup tables over the declarations while freezing them
struct DeclIndex<'a> {
    by_id: HashMap<String, &'a MenuDecl>,
    /// `None` when several declarations share the name
    by_name: HashMap<&'a str, Option<String>>,
}

impl<'a> DeclIndex<'a> {
    fn new(decls: &'a [MenuDecl]) -> Self {
        let mut by_id = HashMap::with_capacity(decls.len());
        let mut by_name = HashMap::with_capacity(decls.len());
        for decl in decls {
            let id = decl.menu_id();
            by_name
                .entry(decl.name())
                .and_modify(|known: &mut Option<String>| {
                    if known.as_deref() != Some(id.as_str()) {
                        *known = None;
                    }
                })
                .or_insert_with(|| Some(id.clone()));
            by_id.insert(id, decl);
        }
        Self { by_id, by_name }
    }

    fn resolve(&self, target: &MenuRef) -> Result<String, RegistryError> {
        let id = match target {
            MenuRef::Declared(factory) => factory().menu_id(),
            MenuRef::Named(name) => {
                if self.by_id.contains_key(name) {
                    name.clone()
                } else {
                    match self.by_name.get(name.as_str()) {
                        Some(Some(id)) => id.clone(),
                        Some(None) => return Err(RegistryError::AmbiguousMenuName(name.clone())),
                        None => return Err(RegistryError::UnknownMenu(name.clone())),
                    }
                }
            }
        };
        if self.by_id.contains_key(&id) {
            Ok(id)
        } else {
            Err(RegistryError::UnknownMenu(id))
        }
    }

    /// Label for an auto-converted button: the target's title, or its name
    fn label_for(&self, id: &str) -> String {
        self.by_id.get(id).map_or_else(
            || id.to_string(),
            |decl| {
                if decl.title.is_empty() {
                    decl.name.clone()
                } else {
                    decl.title.clone()
                }
            },
        )
    }

    fn button(&self, spec: &ButtonSpec) -> Result<Button, RegistryError> {
        let resolve_opt = |target: &Option<MenuRef>| target.as_ref().map(|t| self.resolve(t)).transpose();
        Ok(match spec {
            ButtonSpec::Menu(target) => {
                let target = self.resolve(target)?;
                Button::new(
                    self.label_for(&target),
                    ButtonVariant::Goto {
                        target,
                        value: None,
                    },
                )
            }
            ButtonSpec::Goto {
                label,
                target,
                value,
            } => Button::new(
                label.clone(),
                ButtonVariant::Goto {
                    target: self.resolve(target)?,
                    value: value.clone(),
                },
            ),
            ButtonSpec::Back { label } => Button::new(label.clone(), ButtonVariant::Back),
            ButtonSpec::Cancel { label, target } => Button::new(
                label.clone(),
                ButtonVariant::Cancel {
                    target: resolve_opt(target)?,
                },
            ),
            ButtonSpec::Done { label, target } => Button::new(
                label.clone(),
                ButtonVariant::Done {
                    target: resolve_opt(target)?,
                },
            ),
        })
    }

    fn command(&self, owner: &str, spec: &CommandSpec) -> Result<CommandAction, RegistryError> {
        match spec {
            CommandSpec::Press(spec) => {
                let variant = self.button(spec)?.variant;
                if !variant.is_navigation() {
                    return Err(RegistryError::InvalidMenu {
                        menu: owner.to_string(),
                        reason: "commands can only navigate".to_string(),
                    });
                }
                Ok(CommandAction::Press(variant))
            }
            CommandSpec::Restart(target) => Ok(CommandAction::Restart(self.resolve(target)?)),
        }
    }

    fn freeze(&self, decl: &MenuDecl) -> Result<MenuDefinition, RegistryError> {
        let id = decl.menu_id();
        let mut buttons = Vec::new();

        let body = match &decl.body {
            DeclBody::Goto(specs) => {
                for spec in specs {
                    buttons.push(self.button(spec)?);
                }
                MenuBody::Goto
            }
            DeclBody::Radio(options) => {
                validate_options(&id, options, true)?;
                buttons.extend(options.iter().map(|o| {
                    Button::new(
                        o.label.clone(),
                        ButtonVariant::SelectOption { key: o.key.clone() },
                    )
                }));
                MenuBody::Radio(options.clone())
            }
            DeclBody::Checkbox(options) => {
                validate_options(&id, options, false)?;
                buttons.extend(options.iter().map(|o| {
                    Button::new(
                        o.label.clone(),
                        ButtonVariant::ToggleOption { key: o.key.clone() },
                    )
                }));
                MenuBody::Checkbox(options.clone())
            }
            DeclBody::TextInput { rule, next } => MenuBody::TextInput {
                rule: rule.clone(),
                next: next.as_ref().map(|n| self.resolve(n)).transpose()?,
            },
        };

        let override_start = buttons.len();
        for slot in [&decl.back, &decl.cancel, &decl.done].into_iter().flatten() {
            buttons.push(self.button(slot)?);
        }

        let options = match &body {
            MenuBody::Radio(options) | MenuBody::Checkbox(options) => options.len(),
            _ => 0,
        };
        if options > 0 && decl.page_size == 0 {
            return Err(RegistryError::InvalidMenu {
                menu: id,
                reason: "page size must be at least 1".to_string(),
            });
        }
        let pager = (options > decl.page_size).then(|| {
            buttons.push(Button::new(PREV_PAGE_LABEL, ButtonVariant::PrevPage));
            buttons.push(Button::new(NEXT_PAGE_LABEL, ButtonVariant::NextPage));
            buttons.len() - 2
        });

        let mut commands = BTreeMap::new();
        for (name, spec) in &decl.commands {
            commands.insert(normalize_command_name(name), self.command(&id, spec)?);
        }

        Ok(MenuDefinition {
            tag: menu_tag(&id),
            id,
            name: decl.name.clone(),
            title: decl.title.clone(),
            description: decl.description.clone(),
            escape_title: decl.escape_title,
            escape_description: decl.escape_description,
            body,
            buttons,
            override_start,
            page_size: decl.page_size,
            pager,
            commands,
        })
    }
}

fn validate_options(menu: &str, options: &[MenuOption], exclusive: bool) -> Result<(), RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidMenu {
        menu: menu.to_string(),
        reason,
    };
    if options.is_empty() {
        return Err(invalid("has no options".to_string()));
    }
    let mut seen = HashSet::new();
    for option in options {
        if !seen.insert(option.key.as_str()) {
            return Err(invalid(format!("duplicate option key {:?}", option.key)));
        }
    }
    if exclusive && options.iter().filter(|o| o.default_selected).count() > 1 {
        return Err(invalid("more than one radio option selected by default".to_string()));
    }
    Ok(())
}

/// Frozen, process-wide table of menus
#[derive(Debug)]
pub struct Registry {
    menus: HashMap<String, MenuDefinition>,
    root: String,
    commands: BTreeMap<String, CommandAction>,
}

impl Registry {
    pub fn builder(root: impl Into<MenuRef>) -> RegistryBuilder {
        RegistryBuilder::new(root)
    }

    pub fn resolve(&self, menu_id: &str) -> Result<&MenuDefinition, RegistryError> {
        self.menus
            .get(menu_id)
            .ok_or_else(|| RegistryError::UnknownMenu(menu_id.to_string()))
    }

    pub fn contains(&self, menu_id: &str) -> bool {
        self.menus.contains_key(menu_id)
    }

    /// Menu new conversations start in
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Global command bound to `name` (already normalized)
    pub fn command(&self, name: &str) -> Option<&CommandAction> {
        self.commands.get(name)
    }

    pub fn len(&self) -> usize {
        self.menus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
    }

    /// All menu ids, sorted
    pub fn menu_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.menus.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
