use async_trait::async_trait;
use stepcore::{ConfigField, Node, NodeContext, NodeError, NodeMetadata, NodeOutput};

/// Entry node that passes the incoming payload through
pub struct WebhookTriggerNode;

#[async_trait]
impl Node for WebhookTriggerNode {
    fn node_type(&self) -> &str {
        "trigger.webhook"
    }
    
    async fn execute(&self, ctx: NodeContext<'_>) -> Result<NodeOutput, NodeError> {
        let mut output = NodeOutput::new().with_output("payload", ctx.state.payload());
        
        // Present-but-null still counts as scheduled
        if let Some(schedule_at) = ctx.config.get("schedule_at") {
            output = output.with_output("scheduled_at", schedule_at.clone());
        }
        
        ctx.events.info("Triggered webhook");
        Ok(output)
    }
    
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Start a run from an incoming webhook payload".to_string(),
            category: "trigger".to_string(),
            config: vec![ConfigField::optional(
                "schedule_at",
                "Copied to the output as scheduled_at",
            )],
            ports: vec![],
        }
    }
}
