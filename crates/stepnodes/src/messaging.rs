use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stepcore::{ConfigField, Node, NodeContext, NodeError, NodeMetadata, NodeOutput, Value};
use uuid::Uuid;

/// A message handed to a delivery backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "lowercase")]
pub enum OutboundMessage {
    Email {
        to: Value,
        subject: Value,
        content: Value,
    },
    Sms {
        to: Value,
        content: Value,
    },
}

/// Backend that actually sends messages
#[async_trait]
pub trait MessageDelivery: Send + Sync {
    /// Deliver a message and return the provider's message id
    async fn deliver(&self, message: &OutboundMessage) -> Result<String, NodeError>;
}

/// Stub backend that only logs outgoing messages
pub struct LogDelivery;

#[async_trait]
impl MessageDelivery for LogDelivery {
    async fn deliver(&self, message: &OutboundMessage) -> Result<String, NodeError> {
        let message_id = format!("mock-{}", Uuid::new_v4());
        match message {
            OutboundMessage::Email { to, .. } => {
                tracing::info!("Sending email to {} ({})", to, message_id);
            }
            OutboundMessage::Sms { to, .. } => {
                tracing::info!("Sending SMS to {} ({})", to, message_id);
            }
        }
        Ok(message_id)
    }
}

/// Send an email through the configured delivery backend
pub struct SendEmailNode {
    delivery: Arc<dyn MessageDelivery>,
}

impl SendEmailNode {
    pub fn new(delivery: Arc<dyn MessageDelivery>) -> Self {
        Self { delivery }
    }
}

#[async_trait]
impl Node for SendEmailNode {
    fn node_type(&self) -> &str {
        "action.send_email"
    }
    
    async fn execute(&self, ctx: NodeContext<'_>) -> Result<NodeOutput, NodeError> {
        let to = ctx.require_truthy("to")?.clone();
        let subject = ctx.require_config("subject")?.clone();
        let content = ctx.require_config("content")?.clone();
        
        ctx.events.info("Sending email");
        let message = OutboundMessage::Email {
            to: to.clone(),
            subject: subject.clone(),
            content: content.clone(),
        };
        let message_id = self.delivery.deliver(&message).await?;
        
        Ok(NodeOutput::new()
            .with_output("sent", true)
            .with_output("to", to)
            .with_output("subject", subject)
            .with_output("content", content)
            .with_output("message_id", message_id)
            .with_port("success"))
    }
    
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Send an email".to_string(),
            category: "action".to_string(),
            config: vec![
                ConfigField::required("to", "Recipient address"),
                ConfigField::required("subject", "Subject line"),
                ConfigField::required("content", "Message body"),
            ],
            ports: vec!["success".to_string()],
        }
    }
}

/// Send a text message through the configured delivery backend
pub struct SendSmsNode {
    delivery: Arc<dyn MessageDelivery>,
}

impl SendSmsNode {
    pub fn new(delivery: Arc<dyn MessageDelivery>) -> Self {
        Self { delivery }
    }
}

#[async_trait]
impl Node for SendSmsNode {
    fn node_type(&self) -> &str {
        "action.send_sms"
    }
    
    async fn execute(&self, ctx: NodeContext<'_>) -> Result<NodeOutput, NodeError> {
        let to = ctx.require_truthy("to")?.clone();
        let content = ctx.require_config("content")?.clone();
        
        ctx.events.info("Sending SMS");
        let message = OutboundMessage::Sms {
            to: to.clone(),
            content: content.clone(),
        };
        let message_id = self.delivery.deliver(&message).await?;
        
        Ok(NodeOutput::new()
            .with_output("sent", true)
            .with_output("to", to)
            .with_output("content", content)
            .with_output("message_id", message_id)
            .with_port("success"))
    }
    
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Send an SMS".to_string(),
            category: "action".to_string(),
            config: vec![
                ConfigField::required("to", "Recipient phone number"),
                ConfigField::required("content", "Message text"),
            ],
            ports: vec!["success".to_string()],
        }
    }
}
