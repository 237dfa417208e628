use crate::{events::EventEmitter, Map, NodeError, RunState, Value, ValueExt};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Core trait that all step handlers implement
///
/// Handlers read the run state through their context and return a fresh
/// output mapping; they never write to the state themselves.
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique type identifier (e.g., "logic.condition", "action.send_email")
    fn node_type(&self) -> &str;
    
    /// Execute one step with already-resolved configuration
    async fn execute(&self, ctx: NodeContext<'_>) -> Result<NodeOutput, NodeError>;
    
    /// Optional: Describe the node for catalogs and editors
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::default()
    }
}

/// Execution context passed to each node
pub struct NodeContext<'a> {
    /// Identifier of the node being executed
    pub node_id: &'a str,
    
    /// Configuration with all placeholders resolved
    pub config: Value,
    
    /// Read-only view of the run state before this step
    pub state: &'a RunState,
    
    /// Event emitter for real-time updates
    pub events: EventEmitter,
    
    /// Cancellation token of the run
    pub cancellation: CancellationToken,
}

impl<'a> NodeContext<'a> {
    /// Get config value; null counts as absent
    pub fn config_value(&self, name: &str) -> Option<&Value> {
        self.config.get(name).filter(|v| !v.is_null())
    }
    
    /// Get config value or return error
    pub fn require_config(&self, name: &str) -> Result<&Value, NodeError> {
        self.config_value(name)
            .ok_or_else(|| NodeError::MissingConfig(name.to_string()))
    }
    
    /// Get a config value that must be present and truthy
    pub fn require_truthy(&self, name: &str) -> Result<&Value, NodeError> {
        self.config_value(name)
            .filter(|v| v.is_truthy())
            .ok_or_else(|| NodeError::MissingConfig(name.to_string()))
    }
}

/// Output mapping of one step
///
/// `port` and `next` are reserved keys read by the execution loop; every
/// other key is payload visible to downstream templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeOutput {
    pub outputs: Map<String, Value>,
}

impl NodeOutput {
    pub fn new() -> Self {
        Self::default()
    }
    
    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }
    
    pub fn with_port(self, port: impl Into<String>) -> Self {
        self.with_output("port", port.into())
    }
    
    /// Force the next node, bypassing edge routing
    pub fn with_next(self, node_id: impl Into<String>) -> Self {
        self.with_output("next", node_id.into())
    }
    
    /// Port label, when the node emitted one as a string
    pub fn port(&self) -> Option<&str> {
        self.outputs.get("port").and_then(Value::as_str)
    }
    
    /// Explicit next-node override, when present and non-empty
    pub fn next(&self) -> Option<&str> {
        self.outputs
            .get("next")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
    
    pub fn error(message: impl Into<String>) -> Self {
        Self::new().with_output("error", message.into())
    }
}

impl From<Map<String, Value>> for NodeOutput {
    fn from(outputs: Map<String, Value>) -> Self {
        Self { outputs }
    }
}

/// Metadata about a node type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub description: String,
    pub category: String,
    pub config: Vec<ConfigField>,
    pub ports: Vec<String>,
}

impl Default for NodeMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
            config: Vec::new(),
            ports: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigField {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl ConfigField {
    pub fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: true,
        }
    }
    
    pub fn optional(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: false,
        }
    }
}
