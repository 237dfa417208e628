// crates/stepnodes/tests/nodes_test.rs

use async_trait::async_trait;
use serde_json::json;
use stepcore::{
    EventBus, ExecutionId, Map, Node, NodeContext, NodeError, RunState, Value,
};
use stepnodes::{
    ConditionNode, EndNode, MessageDelivery, OutboundMessage, SendEmailNode, SendSmsNode,
    WebhookTriggerNode,
};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

// Helper function to create a test context
fn create_test_context(state: &RunState, config: Value) -> NodeContext<'_> {
    let event_bus = EventBus::new(100);
    NodeContext {
        node_id: "test",
        config,
        state,
        events: event_bus.create_emitter(ExecutionId::new_v4(), "test"),
        cancellation: CancellationToken::new(),
    }
}

fn state_with_payload(payload: Value) -> RunState {
    let payload = payload.as_object().cloned().unwrap_or_default();
    RunState::new(payload, Map::new())
}

/// Records every message instead of sending it
#[derive(Default)]
struct RecordingDelivery {
    sent: Mutex<Vec<OutboundMessage>>,
}

#[async_trait]
impl MessageDelivery for RecordingDelivery {
    async fn deliver(&self, message: &OutboundMessage) -> Result<String, NodeError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(format!("msg-{}", sent.len()))
    }
}

#[tokio::test]
async fn test_trigger_passes_payload_through() {
    let state = state_with_payload(json!({"customer_name": "Ada"}));
    let ctx = create_test_context(&state, json!({}));
    
    let output = WebhookTriggerNode.execute(ctx).await.unwrap();
    
    assert_eq!(output.outputs["payload"], json!({"customer_name": "Ada"}));
    assert!(!output.outputs.contains_key("scheduled_at"));
    assert_eq!(output.port(), None);
}

#[tokio::test]
async fn test_trigger_copies_schedule() {
    let state = state_with_payload(json!({}));
    
    let ctx = create_test_context(&state, json!({"schedule_at": "2024-01-01T09:00:00Z"}));
    let output = WebhookTriggerNode.execute(ctx).await.unwrap();
    assert_eq!(output.outputs["scheduled_at"], json!("2024-01-01T09:00:00Z"));
    
    let ctx = create_test_context(&state, json!({"schedule_at": null}));
    let output = WebhookTriggerNode.execute(ctx).await.unwrap();
    assert_eq!(output.outputs.get("scheduled_at"), Some(&Value::Null));
}

#[tokio::test]
async fn test_condition_routes_by_result() {
    let state = RunState::default();
    
    let ctx = create_test_context(&state, json!({"left": "5", "op": ">", "right": 3}));
    let output = ConditionNode.execute(ctx).await.unwrap();
    assert_eq!(output.outputs["result"], json!(true));
    assert_eq!(output.port(), Some("true"));
    
    let ctx = create_test_context(&state, json!({"left": "VIP", "op": " == ", "right": "Regular"}));
    let output = ConditionNode.execute(ctx).await.unwrap();
    assert_eq!(output.outputs["result"], json!(false));
    assert_eq!(output.port(), Some("false"));
}

#[tokio::test]
async fn test_condition_without_operator_is_false() {
    let state = RunState::default();
    let ctx = create_test_context(&state, json!({"left": 1, "right": 1}));
    
    let output = ConditionNode.execute(ctx).await.unwrap();
    assert_eq!(output.port(), Some("false"));
}

#[tokio::test]
async fn test_end_node_has_no_outputs() {
    let state = RunState::default();
    let ctx = create_test_context(&state, json!({"ignored": true}));
    
    let output = EndNode.execute(ctx).await.unwrap();
    assert!(output.outputs.is_empty());
}

#[tokio::test]
async fn test_send_email_delivers_message() {
    let delivery = Arc::new(RecordingDelivery::default());
    let node = SendEmailNode::new(delivery.clone());
    let state = RunState::default();
    let ctx = create_test_context(
        &state,
        json!({"to": "ada@example.com", "subject": "Hi", "content": "Welcome!"}),
    );
    
    let output = node.execute(ctx).await.unwrap();
    
    assert_eq!(output.outputs["sent"], json!(true));
    assert_eq!(output.outputs["to"], json!("ada@example.com"));
    assert_eq!(output.outputs["subject"], json!("Hi"));
    assert_eq!(output.outputs["message_id"], json!("msg-1"));
    assert_eq!(output.port(), Some("success"));
    
    let sent = delivery.sent.lock().unwrap();
    assert_eq!(
        *sent,
        vec![OutboundMessage::Email {
            to: json!("ada@example.com"),
            subject: json!("Hi"),
            content: json!("Welcome!"),
        }]
    );
}

#[tokio::test]
async fn test_send_email_requires_recipient() {
    let delivery = Arc::new(RecordingDelivery::default());
    let node = SendEmailNode::new(delivery.clone());
    let state = RunState::default();
    
    // An empty recipient counts as missing
    let ctx = create_test_context(&state, json!({"to": "", "subject": "Hi", "content": "x"}));
    let err = node.execute(ctx).await.unwrap_err();
    assert_eq!(err, NodeError::MissingConfig("to".to_string()));
    assert_eq!(err.to_string(), "'to' is required");
    
    let ctx = create_test_context(&state, json!({"to": "ada@example.com", "content": "x"}));
    let err = node.execute(ctx).await.unwrap_err();
    assert_eq!(err, NodeError::MissingConfig("subject".to_string()));
    
    assert!(delivery.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_send_sms_delivers_message() {
    let delivery = Arc::new(RecordingDelivery::default());
    let node = SendSmsNode::new(delivery.clone());
    let state = RunState::default();
    let ctx = create_test_context(&state, json!({"to": "+15550100", "content": "Code 1234"}));
    
    let output = node.execute(ctx).await.unwrap();
    
    assert_eq!(output.outputs["to"], json!("+15550100"));
    assert_eq!(output.outputs["content"], json!("Code 1234"));
    assert!(!output.outputs.contains_key("subject"));
    assert_eq!(output.port(), Some("success"));
    assert_eq!(delivery.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_send_sms_requires_content() {
    let node = SendSmsNode::new(Arc::new(RecordingDelivery::default()));
    let state = RunState::default();
    let ctx = create_test_context(&state, json!({"to": "+15550100", "content": null}));
    
    let err = node.execute(ctx).await.unwrap_err();
    assert_eq!(err, NodeError::MissingConfig("content".to_string()));
}
