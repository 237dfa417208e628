//! `{{ path }}` placeholder substitution over nested configuration.
//!
//! Paths are dot-separated and resolved against the run state, e.g.
//! `{{ payload.message }}` or `{{ nodes.chat_1.generated_response.items.0 }}`.
//! A path that cannot be found resolves to the empty string.

use regex::{Captures, Regex};
use stepcore::{Map, RunState, Value, ValueExt};
use std::sync::OnceLock;

static TOKEN: OnceLock<Regex> = OnceLock::new();

fn token_regex() -> &'static Regex {
    TOKEN.get_or_init(|| Regex::new(r"\{\{\s*([^}]+?)\s*\}\}").unwrap())
}

/// Resolve every placeholder inside `value`, returning a resolved copy
///
/// Strings are substituted in place, sequences and mappings are traversed
/// element-wise and every other leaf is returned unchanged.
pub fn resolve_templates(value: &Value, state: &RunState) -> Value {
    match value {
        Value::String(s) => Value::String(resolve_str(s, state)),
        Value::Array(items) => Value::Array(
            items.iter().map(|v| resolve_templates(v, state)).collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_templates(v, state)))
                .collect::<Map<String, Value>>(),
        ),
        other => other.clone(),
    }
}

/// Substitute placeholders inside a single string
pub fn resolve_str(text: &str, state: &RunState) -> String {
    if !text.contains("{{") {
        return text.to_string();
    }
    token_regex()
        .replace_all(text, |caps: &Captures| {
            state
                .lookup(caps[1].trim())
                .map(ValueExt::to_text)
                .unwrap_or_default()
        })
        .into_owned()
}
