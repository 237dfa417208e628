use async_trait::async_trait;
use regex::Regex;
use std::cmp::Ordering;
use stepcore::{ConfigField, Node, NodeContext, NodeError, NodeMetadata, NodeOutput, Value, ValueExt};

/// Branch on a comparison between `left` and `right`
///
/// Emits `result` and port `true` or `false`.
pub struct ConditionNode;

#[async_trait]
impl Node for ConditionNode {
    fn node_type(&self) -> &str {
        "logic.condition"
    }
    
    async fn execute(&self, ctx: NodeContext<'_>) -> Result<NodeOutput, NodeError> {
        let left = ctx.config.get("left").unwrap_or(&Value::Null);
        let right = ctx.config.get("right").unwrap_or(&Value::Null);
        let op = ctx
            .config
            .get("op")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim();
        
        let result = evaluate(left, op, right);
        let port = if result { "true" } else { "false" };
        tracing::debug!("Condition {:?} {} {:?} -> {}", left, op, right, port);
        
        Ok(NodeOutput::new()
            .with_output("result", result)
            .with_port(port))
    }
    
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Compare two values and branch on the outcome".to_string(),
            category: "logic".to_string(),
            config: vec![
                ConfigField::required("left", "Left operand"),
                ConfigField::required(
                    "op",
                    "One of ==, !=, >, >=, <, <=, contains, in, regex",
                ),
                ConfigField::required("right", "Right operand (pattern for regex)"),
            ],
            ports: vec!["true".to_string(), "false".to_string()],
        }
    }
}

/// Evaluate `left op right`
///
/// Unsupported operators or operand types evaluate to false.
pub fn evaluate(left: &Value, op: &str, right: &Value) -> bool {
    match op {
        "==" | "eq" => loose_eq(left, right),
        "!=" | "neq" => !loose_eq(left, right),
        ">" => compare(left, right).is_some_and(Ordering::is_gt),
        ">=" => compare(left, right).is_some_and(Ordering::is_ge),
        "<" => compare(left, right).is_some_and(Ordering::is_lt),
        "<=" => compare(left, right).is_some_and(Ordering::is_le),
        "contains" => contains(left, right),
        "in" => contains(right, left),
        "regex" => match (left, right) {
            (Value::String(text), Value::String(pattern)) => Regex::new(pattern)
                .map(|re| re.is_match(text))
                .unwrap_or(false),
            _ => false,
        },
        _ => false,
    }
}

/// Structural equality, except that numbers compare by value at any depth
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64() == r.as_f64(),
        (Value::Array(l), Value::Array(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(a, b)| loose_eq(a, b))
        }
        (Value::Object(l), Value::Object(r)) => {
            l.len() == r.len()
                && l.iter().all(|(k, a)| r.get(k).is_some_and(|b| loose_eq(a, b)))
        }
        _ => left == right,
    }
}

/// Numeric ordering when both sides are numeric, else lexical for two strings
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(l), Some(r)) = (left.numeric(), right.numeric()) {
        return l.partial_cmp(&r);
    }
    match (left, right) {
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

/// Membership of `needle` in a sequence or, for two strings, as a substring
fn contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::Array(items), _) => items.iter().any(|item| loose_eq(item, needle)),
        (Value::String(text), Value::String(part)) => text.contains(part.as_str()),
        _ => false,
    }
}
