use crate::executor::{RunInput, WorkflowExecutor};
use crate::registry::NodeRegistry;
use crate::store::{DefinitionStore, InMemoryDefinitionStore};
use stepcore::{EventBus, ExecutionEvent, FlowError, RunResult, WorkflowDefinition, WorkflowId};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Main runtime for executing workflows
///
/// Cheap to share: every run gets its own state, while the registry,
/// store and event bus are shared read-mostly.
pub struct FlowRuntime {
    registry: Arc<NodeRegistry>,
    executor: Arc<WorkflowExecutor>,
    event_bus: Arc<EventBus>,
    store: Arc<dyn DefinitionStore>,
}

impl FlowRuntime {
    /// Create a new runtime with default settings and no node types
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }
    
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_registry(Arc::new(NodeRegistry::new()), config)
    }
    
    /// Create a new runtime with a pre-configured registry
    pub fn with_registry(registry: Arc<NodeRegistry>, config: RuntimeConfig) -> Self {
        Self {
            registry,
            executor: Arc::new(WorkflowExecutor::new()),
            event_bus: Arc::new(EventBus::new(config.event_buffer_size)),
            store: Arc::new(InMemoryDefinitionStore::new()),
        }
    }
    
    /// Replace the definition store
    pub fn with_store(mut self, store: Arc<dyn DefinitionStore>) -> Self {
        self.store = store;
        self
    }
    
    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }
    
    pub fn store(&self) -> &Arc<dyn DefinitionStore> {
        &self.store
    }
    
    /// Execute a workflow directly
    pub async fn run(
        &self,
        workflow: &WorkflowDefinition,
        input: RunInput,
    ) -> Result<RunResult, FlowError> {
        self.run_with_cancellation(workflow, input, CancellationToken::new())
            .await
    }
    
    /// Execute a workflow that stops at the next node boundary once `cancellation` fires
    pub async fn run_with_cancellation(
        &self,
        workflow: &WorkflowDefinition,
        input: RunInput,
        cancellation: CancellationToken,
    ) -> Result<RunResult, FlowError> {
        self.executor
            .execute(workflow, &self.registry, &self.event_bus, input, cancellation)
            .await
    }
    
    /// Execute a workflow from the definition store
    pub async fn run_stored(
        &self,
        workflow_id: WorkflowId,
        input: RunInput,
    ) -> Result<RunResult, FlowError> {
        let stored = self.store.get(workflow_id).await?;
        self.run(&stored.workflow, input).await
    }
    
    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }
    
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

impl Default for FlowRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Capacity of the execution event channel
    pub event_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
        }
    }
}
