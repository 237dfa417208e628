//! Standard node library
//! 
//! Built-in step handlers: webhook trigger, conditional branch, end
//! marker, messaging actions and the chat completion action.

mod chat;
mod condition;
mod end;
mod extract;
mod messaging;
mod trigger;

pub use chat::{ChatConfig, ChatNode};
pub use condition::{evaluate, ConditionNode};
pub use end::EndNode;
pub use extract::{extract_message, parse_json_from_text};
pub use messaging::{
    LogDelivery, MessageDelivery, OutboundMessage, SendEmailNode, SendSmsNode,
};
pub use trigger::WebhookTriggerNode;
use stepruntime::NodeRegistry;

use std::sync::Arc;

/// Register all standard nodes with a registry
///
/// Messages are delivered through [`LogDelivery`] and the chat node reads
/// its endpoint from the environment.
pub fn register_all(registry: &mut NodeRegistry) {
    register_with(registry, Arc::new(LogDelivery), ChatConfig::from_env());
}

/// Register all standard nodes with explicit collaborators
pub fn register_with(
    registry: &mut NodeRegistry,
    delivery: Arc<dyn MessageDelivery>,
    chat: ChatConfig,
) {
    registry.register(Arc::new(WebhookTriggerNode));
    registry.register(Arc::new(ConditionNode));
    registry.register(Arc::new(EndNode));
    registry.register(Arc::new(SendEmailNode::new(delivery.clone())));
    registry.register(Arc::new(SendSmsNode::new(delivery)));
    registry.register(Arc::new(ChatNode::new(chat)));
}
