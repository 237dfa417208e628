use crate::{HaltReason, Map, NodeId, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub type ExecutionId = Uuid;

/// Events emitted during a workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    RunStarted {
        execution_id: ExecutionId,
        entry: NodeId,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        execution_id: ExecutionId,
        success: bool,
        /// Absent when the run aborted with an error
        halt_reason: Option<HaltReason>,
        steps: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    NodeStarted {
        execution_id: ExecutionId,
        node_id: NodeId,
        node_type: String,
        timestamp: DateTime<Utc>,
    },
    NodeCompleted {
        execution_id: ExecutionId,
        node_id: NodeId,
        port: Option<String>,
        outputs: Map<String, Value>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    NodeFailed {
        execution_id: ExecutionId,
        node_id: NodeId,
        error: String,
        timestamp: DateTime<Utc>,
    },
    NodeEvent {
        execution_id: ExecutionId,
        node_id: NodeId,
        event: NodeEvent,
        timestamp: DateTime<Utc>,
    },
}

/// Events specific to node execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum NodeEvent {
    Info { message: String },
    Warning { message: String },
}

/// Event emitter handed to a node for the duration of one step
#[derive(Clone)]
pub struct EventEmitter {
    execution_id: ExecutionId,
    node_id: NodeId,
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventEmitter {
    pub fn new(
        execution_id: ExecutionId,
        node_id: impl Into<NodeId>,
        sender: broadcast::Sender<ExecutionEvent>,
    ) -> Self {
        Self {
            execution_id,
            node_id: node_id.into(),
            sender,
        }
    }
    
    /// Emit a node-specific event
    pub fn emit(&self, event: NodeEvent) {
        let _ = self.sender.send(ExecutionEvent::NodeEvent {
            execution_id: self.execution_id,
            node_id: self.node_id.clone(),
            event,
            timestamp: Utc::now(),
        });
    }
    
    pub fn info(&self, message: impl Into<String>) {
        self.emit(NodeEvent::Info {
            message: message.into(),
        });
    }
    
    pub fn warn(&self, message: impl Into<String>) {
        self.emit(NodeEvent::Warning {
            message: message.into(),
        });
    }
}

/// Broadcast bus shared by every run of a runtime
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    /// A zero capacity is raised to one
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }
    
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }
    
    /// Send an event; a bus without subscribers drops it silently
    pub fn emit(&self, event: ExecutionEvent) {
        let _ = self.sender.send(event);
    }
    
    pub fn create_emitter(&self, execution_id: ExecutionId, node_id: &str) -> EventEmitter {
        EventEmitter::new(execution_id, node_id, self.sender.clone())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_bus_still_delivers() {
        let bus = EventBus::new(0);
        let mut events = bus.subscribe();
        let execution_id = ExecutionId::new_v4();

        bus.create_emitter(execution_id, "hook").info("hello");

        match events.try_recv() {
            Ok(ExecutionEvent::NodeEvent { node_id, event, .. }) => {
                assert_eq!(node_id, "hook");
                assert!(matches!(event, NodeEvent::Info { message } if message == "hello"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::default();
        bus.create_emitter(ExecutionId::new_v4(), "hook").warn("nobody listening");
    }
}
