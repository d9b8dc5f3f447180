//! `$name` parameter substitution for configuration text
//!
//! Placeholders are `$name` or `${name}`; `$$` produces a literal dollar.
//! Unknown placeholders are left untouched so that templates can be filled
//! in several passes.

use crate::types::Record;
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;

/// Named substitution values
pub type Params = Record;

fn placeholder() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$(?:(\$)|([_A-Za-z][_A-Za-z0-9]*)|\{([_A-Za-z][_A-Za-z0-9]*)\})")
            .expect("placeholder pattern compiles")
    })
}

/// Replace known placeholders in `template` with their rendered values
pub fn substitute(template: &str, params: &Params) -> String {
    if params.is_empty() && !template.contains("$$") {
        return template.to_string();
    }
    placeholder()
        .replace_all(template, |caps: &Captures<'_>| {
            if caps.get(1).is_some() {
                return "$".to_string();
            }
            let name = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
            match params.get(name) {
                Some(value) => render(value),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Text form of a parameter value: strings raw, everything else as JSON
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
