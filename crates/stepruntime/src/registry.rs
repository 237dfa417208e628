use stepcore::{Node, NodeMetadata};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of available node types
///
/// Read-only once built; share it between concurrent runs behind an `Arc`.
pub struct NodeRegistry {
    handlers: HashMap<String, Arc<dyn Node>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
    
    /// Register a handler under its own node type, replacing any previous one
    pub fn register(&mut self, handler: Arc<dyn Node>) {
        let node_type = handler.node_type().to_string();
        self.register_as(node_type, handler);
    }
    
    /// Register a handler under an explicit type identifier
    ///
    /// One handler may serve several identifiers, e.g. an alias kept for
    /// older definitions.
    pub fn register_as(&mut self, node_type: impl Into<String>, handler: Arc<dyn Node>) {
        let node_type = node_type.into();
        tracing::info!("Registering node type: {}", node_type);
        if self.handlers.insert(node_type.clone(), handler).is_some() {
            tracing::warn!("Node type {} was already registered; replaced", node_type);
        }
    }
    
    /// Look up the handler for a node type
    pub fn get(&self, node_type: &str) -> Option<Arc<dyn Node>> {
        self.handlers.get(node_type).cloned()
    }
    
    pub fn contains(&self, node_type: &str) -> bool {
        self.handlers.contains_key(node_type)
    }
    
    /// Get all registered node types, sorted
    pub fn list_node_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }
    
    /// Get metadata for a node type
    pub fn get_metadata(&self, node_type: &str) -> Option<NodeMetadata> {
        self.handlers.get(node_type).map(|h| h.metadata())
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use stepcore::{NodeContext, NodeError, NodeOutput};

    struct Named(&'static str);

    #[async_trait]
    impl Node for Named {
        fn node_type(&self) -> &str {
            self.0
        }

        async fn execute(&self, _ctx: NodeContext<'_>) -> Result<NodeOutput, NodeError> {
            Ok(NodeOutput::new())
        }
    }

    #[test]
    fn test_register_uses_handler_type() {
        let mut registry = NodeRegistry::new();
        registry.register(Arc::new(Named("logic.end")));
        assert!(registry.contains("logic.end"));
        assert_eq!(registry.list_node_types(), vec!["logic.end"]);
    }

    #[test]
    fn test_register_as_explicit_identifier() {
        let mut registry = NodeRegistry::new();
        let handler: Arc<dyn Node> = Arc::new(Named("action.send_email"));
        registry.register(handler.clone());
        registry.register_as("action.email", handler);

        assert_eq!(
            registry.list_node_types(),
            vec!["action.email", "action.send_email"]
        );
        let alias = registry.get("action.email").unwrap();
        assert_eq!(alias.node_type(), "action.send_email");
    }

    #[test]
    fn test_later_registration_replaces() {
        let mut registry = NodeRegistry::new();
        registry.register_as("x.step", Arc::new(Named("first")));
        registry.register_as("x.step", Arc::new(Named("second")));
        assert_eq!(registry.get("x.step").unwrap().node_type(), "second");
        assert!(registry.get("missing").is_none());
    }
}
