//! Best-effort JSON extraction from free-text model output.

use regex::Regex;
use std::sync::OnceLock;
use stepcore::Value;

static FENCE: OnceLock<Regex> = OnceLock::new();

fn fence_regex() -> &'static Regex {
    FENCE.get_or_init(|| Regex::new(r"(?i)```(?:json)?\s*([\s\S]*?)\s*```").unwrap())
}

/// Decode JSON embedded in model output, falling back to the raw text
///
/// Text that starts with `{` or `[` is parsed directly; otherwise each
/// fenced code block is tried in order. Never fails: anything that does
/// not decode comes back as a JSON string holding the original text.
pub fn parse_json_from_text(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str(trimmed) {
            return value;
        }
    }
    
    fence_regex()
        .captures_iter(text)
        .find_map(|caps| serde_json::from_str(caps[1].trim()).ok())
        .unwrap_or_else(|| Value::String(text.to_string()))
}

/// First string among `message`, `content` and `text` of an object
pub fn extract_message(value: &Value) -> Option<&str> {
    let object = value.as_object()?;
    ["message", "content", "text"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_leading_object_is_parsed() {
        assert_eq!(parse_json_from_text("  {\"a\": 1}  "), json!({"a": 1}));
        assert_eq!(parse_json_from_text("[1, 2]"), json!([1, 2]));
    }

    #[test]
    fn test_fenced_block_is_parsed() {
        let text = "Here you go:\n```json\n{\"subject\": \"Hi\"}\n```\nThanks";
        assert_eq!(parse_json_from_text(text), json!({"subject": "Hi"}));

        let untagged = "```\n[\"x\"]\n```";
        assert_eq!(parse_json_from_text(untagged), json!(["x"]));

        let upper = "```JSON\n{\"k\": true}\n```";
        assert_eq!(parse_json_from_text(upper), json!({"k": true}));
    }

    #[test]
    fn test_later_fence_used_when_first_is_invalid() {
        let text = "```\nnot json\n```\nand\n```json\n{\"ok\": 1}\n```";
        assert_eq!(parse_json_from_text(text), json!({"ok": 1}));
    }

    #[test]
    fn test_broken_leading_json_falls_back_to_fences() {
        let text = "{ broken\n```json\n{\"ok\": 2}\n```";
        assert_eq!(parse_json_from_text(text), json!({"ok": 2}));
    }

    #[test]
    fn test_plain_text_is_returned_untouched() {
        let text = "  Just a friendly hello.  ";
        assert_eq!(parse_json_from_text(text), json!(text));
        assert_eq!(parse_json_from_text("{ nope"), json!("{ nope"));
    }

    #[test]
    fn test_extract_message_keys_in_order() {
        assert_eq!(extract_message(&json!({"text": "t", "content": "c"})), Some("c"));
        assert_eq!(extract_message(&json!({"message": 5, "text": "t"})), Some("t"));
        assert_eq!(extract_message(&json!(["message"])), None);
        assert_eq!(extract_message(&json!("message")), None);
    }
}
