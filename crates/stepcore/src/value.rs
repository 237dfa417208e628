//! Helpers over JSON values used for configuration, outputs and run state.

pub use serde_json::{Map, Value};

/// Extension methods shared by the template resolver and the built-in nodes
pub trait ValueExt {
    /// Step into a mapping key or a sequence index.
    ///
    /// Sequences accept only non-negative in-bounds integer segments; any
    /// other value type is not indexable.
    fn get_segment(&self, segment: &str) -> Option<&Value>;

    /// Walk a dot-separated path such as `items.0.id`
    fn get_path(&self, path: &str) -> Option<&Value>;

    /// Text used when substituting a value into a string
    fn to_text(&self) -> String;

    /// Numeric view: JSON numbers, or non-blank strings that parse as floats
    fn numeric(&self) -> Option<f64>;

    /// Loose truthiness: null, false, 0, "" and empty collections are falsy
    fn is_truthy(&self) -> bool;
}

impl ValueExt for Value {
    fn get_segment(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Array(items) => {
                let idx: usize = segment.parse().ok()?;
                items.get(idx)
            }
            Value::Object(map) => map.get(segment),
            _ => None,
        }
    }

    fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(self, |current, segment| current.get_segment(segment))
    }

    fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            Value::String(s) if !s.trim().is_empty() => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_path_descends_maps_and_lists() {
        let value = json!({"items": [{"id": "a"}, {"id": "b"}]});
        assert_eq!(value.get_path("items.1.id"), Some(&json!("b")));
        assert_eq!(value.get_path("items.2.id"), None);
        assert_eq!(value.get_path("items.-1"), None);
        assert_eq!(value.get_path("items.first"), None);
        assert_eq!(value.get_path("items.0.id.more"), None);
    }

    #[test]
    fn test_to_text() {
        assert_eq!(json!("plain").to_text(), "plain");
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(json!(42).to_text(), "42");
        assert_eq!(json!(true).to_text(), "true");
        assert_eq!(json!({"a": 1}).to_text(), r#"{"a":1}"#);
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(json!(5).numeric(), Some(5.0));
        assert_eq!(json!(" 3.5 ").numeric(), Some(3.5));
        assert_eq!(json!("").numeric(), None);
        assert_eq!(json!("abc").numeric(), None);
        assert_eq!(json!(true).numeric(), None);
    }

    #[test]
    fn test_is_truthy() {
        assert!(!json!("").is_truthy());
        assert!(!json!(0).is_truthy());
        assert!(!json!([]).is_truthy());
        assert!(json!("x").is_truthy());
        assert!(json!({"k": null}).is_truthy());
    }
}
