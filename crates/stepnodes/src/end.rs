use async_trait::async_trait;
use stepcore::{Node, NodeContext, NodeError, NodeMetadata, NodeOutput, END_NODE_TYPE};

/// Terminal marker; the executor halts on its type
pub struct EndNode;

#[async_trait]
impl Node for EndNode {
    fn node_type(&self) -> &str {
        END_NODE_TYPE
    }
    
    async fn execute(&self, _ctx: NodeContext<'_>) -> Result<NodeOutput, NodeError> {
        Ok(NodeOutput::new())
    }
    
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Stop the run".to_string(),
            category: "logic".to_string(),
            config: vec![],
            ports: vec![],
        }
    }
}
