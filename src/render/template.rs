//! `{name}` placeholder substitution with HTML escaping

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid placeholder regex")
});

/// Escape the characters Telegram's HTML parse mode treats specially
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Substitute placeholders in `template`.
///
/// Substituted values are always escaped. Literal template text is escaped
/// only when `escape_literals` is set, so authors can opt into raw HTML.
/// Placeholders `lookup` does not know are left as written.
pub fn fill<F>(template: &str, escape_literals: bool, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let literal = |text: &str| {
        if escape_literals {
            escape_html(text).into_owned()
        } else {
            text.to_string()
        }
    };

    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&literal(template.get(last..whole.start()).unwrap_or_default()));
        match lookup(name.as_str()) {
            Some(value) => out.push_str(&escape_html(&value)),
            None => out.push_str(&literal(whole.as_str())),
        }
        last = whole.end();
    }
    out.push_str(&literal(template.get(last..).unwrap_or_default()));
    out
}
