//! Pure rendering of a menu into message text and inline buttons

pub mod template;

use crate::menu::{ButtonVariant, CallbackToken, MenuDefinition, MenuKind};
use crate::state_machine::{CollectedData, StoredValue};
use serde::{Deserialize, Serialize};
pub use template::escape_html;

const RADIO_ON: &str = "🔘";
const RADIO_OFF: &str = "⚪";
const CHECKBOX_ON: &str = "✅";
const CHECKBOX_OFF: &str = "⬜";
const SECRET_MASK: &str = "••••••";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub label: String,
    /// Callback token sent back when the button is pressed
    pub token: String,
}

/// Message text (HTML) plus rows of inline buttons
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderPayload {
    pub text: String,
    pub buttons: Vec<Vec<InlineButton>>,
}

/// Render `menu` with the conversation's collected data, showing option
/// page `page` of a paged menu.
///
/// Deterministic: the same inputs always give the same payload. `notice` is
/// appended below the description (validation errors).
pub fn render(
    menu: &MenuDefinition,
    collected: &CollectedData,
    page: usize,
    notice: Option<&str>,
) -> RenderPayload {
    let current = collected.get(&menu.id);
    let page = menu.clamp_page(page);
    let lookup = |name: &str| -> Option<String> {
        match name {
            "title" => Some(menu.title.clone()),
            "description" => Some(menu.description.clone()),
            "page" => Some((page + 1).to_string()),
            "pages" => Some(menu.page_count().to_string()),
            "value" => Some(current.map(|v| summarize(menu, v)).unwrap_or_default()),
            "menu_id" => Some(menu.id.clone()),
            other => collected.get(other).map(summarize_foreign),
        }
    };

    let mut sections = Vec::with_capacity(3);
    let title = template::fill(&menu.title, menu.escape_title, lookup);
    if !title.is_empty() {
        sections.push(format!("<b>{title}</b>"));
    }
    let description = template::fill(&menu.description, menu.escape_description, lookup);
    if !description.is_empty() {
        sections.push(description);
    }
    if sections.is_empty() {
        sections.push(format!("<b>{}</b>", escape_html(&menu.name)));
    }
    let mut text = sections.join("\n");
    if let Some(notice) = notice {
        text.push_str("\n\n⚠️ ");
        text.push_str(&escape_html(notice));
    }

    RenderPayload {
        text,
        buttons: button_rows(menu, current, page),
    }
}

/// One row per body button of the shown page, then the page buttons that
/// lead somewhere, then the overrides (back/cancel/done) sharing the last row
fn button_rows(menu: &MenuDefinition, current: Option<&StoredValue>, page: usize) -> Vec<Vec<InlineButton>> {
    let inline = |index: usize| {
        let button = &menu.buttons[index];
        InlineButton {
            label: decorate(&button.label, &button.variant, current),
            token: CallbackToken::new(menu.tag.as_str(), index).encode(),
        }
    };

    let split = menu.override_start.min(menu.buttons.len());
    let overrides_end = menu.pager.unwrap_or(menu.buttons.len()).min(menu.buttons.len());
    let mut rows: Vec<Vec<InlineButton>> = menu.page_range(page).map(|i| vec![inline(i)]).collect();
    if let Some(prev) = menu.pager {
        let mut pager = Vec::with_capacity(2);
        if page > 0 {
            pager.push(inline(prev));
        }
        if page + 1 < menu.page_count() {
            pager.push(inline(prev + 1));
        }
        if !pager.is_empty() {
            rows.push(pager);
        }
    }
    let overrides: Vec<InlineButton> = (split..overrides_end).map(inline).collect();
    if !overrides.is_empty() {
        rows.push(overrides);
    }
    rows
}

fn decorate(label: &str, variant: &ButtonVariant, current: Option<&StoredValue>) -> String {
    match variant {
        ButtonVariant::SelectOption { key } => {
            let on = matches!(current, Some(StoredValue::Selected(selected)) if selected == key);
            format!("{} {label}", if on { RADIO_ON } else { RADIO_OFF })
        }
        ButtonVariant::ToggleOption { key } => {
            let on = matches!(current, Some(StoredValue::Checked(keys)) if keys.contains(key));
            format!("{} {label}", if on { CHECKBOX_ON } else { CHECKBOX_OFF })
        }
        _ => label.to_string(),
    }
}

/// Human readable form of the menu's own value: option labels for Radio and
/// Checkbox (in option order), the typed value otherwise
pub fn summarize(menu: &MenuDefinition, value: &StoredValue) -> String {
    match (menu.kind(), value) {
        (MenuKind::Radio, StoredValue::Selected(key)) => menu
            .option(key)
            .map_or_else(|| key.clone(), |o| o.label.clone()),
        (MenuKind::Checkbox, StoredValue::Checked(keys)) => menu
            .options()
            .iter()
            .filter(|o| keys.contains(&o.key))
            .map(|o| o.label.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        (_, value) => summarize_foreign(value),
    }
}

/// Summary of a value from another menu, where option labels are not at hand
fn summarize_foreign(value: &StoredValue) -> String {
    match value {
        StoredValue::Selected(key) => key.clone(),
        StoredValue::Checked(keys) => keys.iter().cloned().collect::<Vec<_>>().join(", "),
        StoredValue::Text(text) => text.clone(),
        StoredValue::Int(n) => n.to_string(),
        StoredValue::Float(f) => f.to_string(),
        StoredValue::Secret(_) => SECRET_MASK.to_string(),
    }
}
