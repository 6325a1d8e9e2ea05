//! Inline CSS accumulation.

use std::fmt::Display;
use std::sync::LazyLock;

use regex::Regex;

static ZERO_LENGTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[+-]?(?:0+(?:\.0*)?|\.0+)(?:px|pt|em|rem|ex|ch|vw|vh|vmin|vmax|cm|mm|in|pc|%)?$")
        .expect("zero-length pattern is valid")
});

/// Deduplicate and prune a semicolon-joined declaration list.
///
/// Later declarations of a property replace earlier ones but keep the
/// position where the property first appeared. Zero-valued margin, padding
/// and border declarations are dropped, and repeated families inside a
/// `font-family` list are removed. The result is a fixed point:
/// `accumulate(&accumulate(s)) == accumulate(s)`.
pub fn accumulate(candidate: &str) -> String {
    let mut entries: Vec<(String, String)> = Vec::new();
    for declaration in candidate.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let property = property.trim().to_ascii_lowercase();
        let value = value.trim();
        if property.is_empty() || value.is_empty() {
            continue;
        }
        let value = if property == "font-family" {
            dedupe_families(value)
        } else {
            value.to_string()
        };
        if value.is_empty() {
            continue;
        }
        match entries.iter_mut().find(|(existing, _)| *existing == property) {
            Some(entry) => entry.1 = value,
            None => entries.push((property, value)),
        }
    }

    entries
        .into_iter()
        .filter(|(property, value)| !(is_box_property(property) && is_zero_length(value)))
        .map(|(property, value)| format!("{property}:{value}"))
        .collect::<Vec<_>>()
        .join(";")
}

fn is_box_property(property: &str) -> bool {
    ["margin", "padding", "border"]
        .iter()
        .any(|prefix| property.starts_with(prefix))
}

/// True when every component of a (possibly shorthand) value is a zero length.
fn is_zero_length(value: &str) -> bool {
    let mut parts = value.split_whitespace().peekable();
    parts.peek().is_some() && parts.all(|part| ZERO_LENGTH.is_match(part))
}

fn dedupe_families(value: &str) -> String {
    let mut seen: Vec<String> = Vec::new();
    let mut families = Vec::new();
    for family in value.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        let key = family
            .trim_matches(|c| c == '\'' || c == '"')
            .to_ascii_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            families.push(family);
        }
    }
    families.join(", ")
}

/// CSS number with at most two decimals and no trailing zeros.
pub fn number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{rounded:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Collects declarations for one element and runs them through
/// [`accumulate`].
#[derive(Debug, Clone, Default)]
pub struct StyleBuilder {
    declarations: Vec<String>,
}

impl StyleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, property: &str, value: impl Display) -> &mut Self {
        self.declarations.push(format!("{property}:{value}"));
        self
    }

    pub fn push_opt(&mut self, property: &str, value: Option<impl Display>) -> &mut Self {
        if let Some(value) = value {
            self.push(property, value);
        }
        self
    }

    /// Append an already-joined declaration list.
    pub fn extend_raw(&mut self, declarations: &str) -> &mut Self {
        if !declarations.is_empty() {
            self.declarations.push(declarations.to_string());
        }
        self
    }

    pub fn build(&self) -> String {
        accumulate(&self.declarations.join(";"))
    }
}
