use crate::{events::ExecutionId, Map, NodeId, Value, ValueExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mutable state of a single run
///
/// A JSON mapping holding `nodes` (node id -> latest outputs), `payload`
/// (the input payload) and any caller-supplied initial fields. Template
/// paths are resolved against this mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunState(Map<String, Value>);

impl RunState {
    /// Fresh state for a run; initial fields are merged over the defaults
    pub fn new(payload: Map<String, Value>, initial_state: Map<String, Value>) -> Self {
        let mut state = Map::new();
        state.insert("nodes".to_string(), Value::Object(Map::new()));
        state.insert("payload".to_string(), Value::Object(payload));
        state.extend(initial_state);
        Self(state)
    }
    
    pub fn payload(&self) -> Value {
        self.0.get("payload").cloned().unwrap_or(Value::Object(Map::new()))
    }
    
    pub fn node_output(&self, node_id: &str) -> Option<&Value> {
        self.0.get("nodes").and_then(|nodes| nodes.get(node_id))
    }
    
    /// Look up a dot-separated path from the state root
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        segments.try_fold(self.0.get(first)?, |current, segment| {
            current.get_segment(segment)
        })
    }
    
    /// Store a node's outputs, replacing any earlier outputs of that node
    pub fn record_output(&mut self, node_id: &str, outputs: Map<String, Value>) {
        let nodes = self
            .0
            .entry("nodes")
            .or_insert_with(|| Value::Object(Map::new()));
        if !nodes.is_object() {
            *nodes = Value::Object(Map::new());
        }
        if let Value::Object(nodes) = nodes {
            nodes.insert(node_id.to_string(), Value::Object(outputs));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Error,
}

/// Record of one executed node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepLog {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub port: Option<String>,
    pub error: Option<String>,
    pub outputs: Map<String, Value>,
}

impl StepLog {
    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    /// No next node could be determined
    Completed,
    /// The terminal node type was executed
    EndNode,
    /// A handler reported an error
    HandlerError,
    /// The run's cancellation token fired
    Cancelled,
}

/// Final state of a run together with its trace and step logs
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub execution_id: ExecutionId,
    #[serde(flatten)]
    pub state: RunState,
    pub trace: Vec<NodeId>,
    pub logs: Vec<StepLog>,
    pub halt_reason: HaltReason,
}

impl RunResult {
    pub fn new(
        execution_id: ExecutionId,
        state: RunState,
        trace: Vec<NodeId>,
        logs: Vec<StepLog>,
        halt_reason: HaltReason,
    ) -> Self {
        // Caller fields with these names are shadowed by the engine's own.
        let mut state = state;
        for reserved in ["execution_id", "trace", "logs", "halt_reason"] {
            state.0.remove(reserved);
        }
        Self {
            execution_id,
            state,
            trace,
            logs,
            halt_reason,
        }
    }
    
    /// A run succeeded when its last step succeeded and it was not cancelled
    pub fn succeeded(&self) -> bool {
        self.halt_reason != HaltReason::Cancelled
            && self.logs.last().map_or(true, StepLog::is_success)
    }
    
    pub fn last_log(&self) -> Option<&StepLog> {
        self.logs.last()
    }
}
