use crate::graph::ValidatedWorkflow;
use crate::registry::NodeRegistry;
use crate::template::resolve_templates;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use stepcore::{
    EventBus, ExecutionEvent, ExecutionId, FlowError, HaltReason, Map, NodeContext, NodeError,
    NodeOutput, RunResult, RunState, StepLog, StepStatus, Value, WorkflowDefinition,
    WorkflowError,
};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Caller-supplied inputs of a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunInput {
    /// Input payload, visible to templates as `payload`
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
    
    /// Extra top-level state fields merged in at run start
    #[serde(default)]
    pub initial_state: Option<Map<String, Value>>,
}

impl RunInput {
    pub fn with_payload(payload: Map<String, Value>) -> Self {
        Self {
            payload: Some(payload),
            initial_state: None,
        }
    }
}

/// Walks a workflow graph one node at a time
#[derive(Debug, Default)]
pub struct WorkflowExecutor;

impl WorkflowExecutor {
    pub fn new() -> Self {
        Self
    }
    
    /// Execute a workflow and return its final state, trace and logs
    ///
    /// Validation and entry errors are returned before any node runs. A
    /// node type without a handler aborts the run with an error. Handler
    /// failures do not produce `Err`; they end the run and are recorded in
    /// the last step log.
    pub async fn execute(
        &self,
        workflow: &WorkflowDefinition,
        registry: &NodeRegistry,
        event_bus: &EventBus,
        input: RunInput,
        cancellation: CancellationToken,
    ) -> Result<RunResult, FlowError> {
        let graph = ValidatedWorkflow::new(workflow)?;
        let entry = graph.resolve_entry()?;
        
        let execution_id = ExecutionId::new_v4();
        let start_time = Instant::now();
        
        event_bus.emit(ExecutionEvent::RunStarted {
            execution_id,
            entry: entry.to_string(),
            timestamp: Utc::now(),
        });
        
        info!("Starting run {} at entry node '{}'", execution_id, entry);
        
        let result = self
            .run_steps(&graph, entry, registry, event_bus, execution_id, input, &cancellation)
            .await;
        
        let duration_ms = start_time.elapsed().as_millis() as u64;
        match &result {
            Ok(run) => {
                info!(
                    "Run {} finished after {} steps in {}ms ({:?})",
                    execution_id,
                    run.logs.len(),
                    duration_ms,
                    run.halt_reason
                );
                event_bus.emit(ExecutionEvent::RunCompleted {
                    execution_id,
                    success: run.succeeded(),
                    halt_reason: Some(run.halt_reason),
                    steps: run.logs.len(),
                    duration_ms,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                error!("Run {} aborted: {}", execution_id, e);
                event_bus.emit(ExecutionEvent::RunCompleted {
                    execution_id,
                    success: false,
                    halt_reason: None,
                    steps: 0,
                    duration_ms,
                    timestamp: Utc::now(),
                });
            }
        }
        
        result
    }
    
    #[allow(clippy::too_many_arguments)]
    async fn run_steps(
        &self,
        graph: &ValidatedWorkflow<'_>,
        entry: &str,
        registry: &NodeRegistry,
        event_bus: &EventBus,
        execution_id: ExecutionId,
        input: RunInput,
        cancellation: &CancellationToken,
    ) -> Result<RunResult, FlowError> {
        let mut state = RunState::new(
            input.payload.unwrap_or_default(),
            input.initial_state.unwrap_or_default(),
        );
        let mut trace: Vec<String> = Vec::new();
        let mut logs: Vec<StepLog> = Vec::new();
        let mut current = entry.to_string();
        
        let halt_reason = loop {
            if cancellation.is_cancelled() {
                warn!("Run {} cancelled before node '{}'", execution_id, current);
                break HaltReason::Cancelled;
            }
            
            trace.push(current.clone());
            
            // An invalid `next` override surfaces here
            let node = graph
                .node(&current)
                .ok_or_else(|| WorkflowError::NodeNotFound(current.clone()))?;
            
            let config = resolve_templates(&node.config, &state);
            
            let handler = registry.get(&node.node_type).ok_or_else(|| {
                FlowError::UnknownNodeType {
                    node_id: current.clone(),
                    node_type: node.node_type.clone(),
                }
            })?;
            
            event_bus.emit(ExecutionEvent::NodeStarted {
                execution_id,
                node_id: current.clone(),
                node_type: node.node_type.clone(),
                timestamp: Utc::now(),
            });
            debug!("Executing node '{}' ({})", current, node.node_type);
            
            let started_at = Utc::now();
            let step_start = Instant::now();
            let ctx = NodeContext {
                node_id: &current,
                config,
                state: &state,
                events: event_bus.create_emitter(execution_id, &current),
                cancellation: cancellation.clone(),
            };
            let result = handler.execute(ctx).await;
            let elapsed_ms = step_start.elapsed().as_millis() as u64;
            let finished_at = Utc::now();
            
            let interrupted = matches!(result, Err(NodeError::Cancelled));
            let (status, error, output) = match result {
                Ok(output) => (StepStatus::Success, None, output),
                Err(e) => {
                    let message = e.to_string();
                    (StepStatus::Error, Some(message.clone()), NodeOutput::error(message))
                }
            };
            
            state.record_output(&current, output.outputs.clone());
            
            let port = output.port().map(str::to_string);
            match &error {
                None => {
                    info!("Node {} completed in {}ms", current, elapsed_ms);
                    event_bus.emit(ExecutionEvent::NodeCompleted {
                        execution_id,
                        node_id: current.clone(),
                        port: port.clone(),
                        outputs: output.outputs.clone(),
                        duration_ms: elapsed_ms,
                        timestamp: finished_at,
                    });
                }
                Some(message) => {
                    error!("Node {} failed: {}", current, message);
                    event_bus.emit(ExecutionEvent::NodeFailed {
                        execution_id,
                        node_id: current.clone(),
                        error: message.clone(),
                        timestamp: finished_at,
                    });
                }
            }
            
            let next = match output.next() {
                Some(next) => Some(next.to_string()),
                None => graph
                    .next_node(&current, port.as_deref())
                    .map(str::to_string),
            };
            
            logs.push(StepLog {
                id: current.clone(),
                node_type: node.node_type.clone(),
                status,
                started_at,
                finished_at,
                elapsed_ms,
                port,
                error,
                outputs: output.outputs,
            });
            
            if interrupted {
                break HaltReason::Cancelled;
            }
            if status == StepStatus::Error {
                break HaltReason::HandlerError;
            }
            if node.is_end() {
                break HaltReason::EndNode;
            }
            match next {
                Some(next) => current = next,
                None => break HaltReason::Completed,
            }
        };
        
        Ok(RunResult::new(execution_id, state, trace, logs, halt_reason))
    }
}
