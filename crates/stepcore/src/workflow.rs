use crate::{Map, Value};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type WorkflowId = Uuid;
pub type NodeId = String;

/// Type identifier of the terminal node; reaching it always halts a run
pub const END_NODE_TYPE: &str = "logic.end";

/// Namespace prefix shared by trigger node types
pub const TRIGGER_NAMESPACE: &str = "trigger.";

/// Complete workflow definition
///
/// Wire shape: `{ nodes: [{id, type, config}], edges: [{source, target, source_port?}], entry?: id }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<NodeId>,
}

impl WorkflowDefinition {
    pub fn new() -> Self {
        Self::default()
    }
    
    pub fn add_node(&mut self, node: NodeSpec) -> NodeId {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }
    
    /// Add an unlabeled edge
    pub fn connect(&mut self, source: impl Into<String>, target: impl Into<String>) {
        self.edges.push(Edge::new(source, target));
    }
    
    /// Add an edge taken when `source` emits `port`
    pub fn connect_port(
        &mut self,
        source: impl Into<String>,
        port: impl Into<String>,
        target: impl Into<String>,
    ) {
        self.edges.push(Edge::new(source, target).with_port(port));
    }
    
    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = Some(entry.into());
        self
    }
}

/// Node specification in a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    #[serde(default)]
    pub id: NodeId,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default = "empty_config")]
    pub config: Value,
}

fn empty_config() -> Value {
    Value::Object(Map::new())
}

impl NodeSpec {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            config: empty_config(),
        }
    }
    
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if !self.config.is_object() {
            self.config = empty_config();
        }
        if let Value::Object(map) = &mut self.config {
            map.insert(key.into(), value.into());
        }
        self
    }
    
    pub fn is_trigger(&self) -> bool {
        self.node_type.starts_with(TRIGGER_NAMESPACE)
    }
    
    pub fn is_end(&self) -> bool {
        self.node_type == END_NODE_TYPE
    }
}

/// Directed edge, optionally labeled with the source port it follows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_port: Option<String>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_port: None,
        }
    }
    
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.source_port = Some(port.into());
        self
    }
    
    /// Port label, with an empty label treated as no label
    pub fn port(&self) -> Option<&str> {
        self.source_port.as_deref().filter(|p| !p.is_empty())
    }
}
