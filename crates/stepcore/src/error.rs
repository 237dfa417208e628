use thiserror::Error;

/// Errors visible to the caller of a run.
///
/// Handler failures are not represented here; they are recorded in the
/// run's step logs instead.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),
    
    #[error("No handler for node type '{node_type}' (node '{node_id}')")]
    UnknownNodeType {
        node_id: String,
        node_type: String,
    },
    
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("'{0}' is required")]
    MissingConfig(String),
    
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
    
    #[error("Cancelled")]
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("Workflow not found: {0}")]
    NotFound(String),
    
    #[error("Every node must have an 'id'")]
    MissingNodeId,
    
    #[error("Duplicate node id: {0}")]
    DuplicateNodeId(String),
    
    #[error("Workflow has no nodes")]
    NoNodes,
    
    #[error("Edge target not found: {target} (from '{from}')")]
    EdgeTargetNotFound {
        from: String,
        target: String,
    },
    
    #[error("Entry node '{0}' not found")]
    EntryNotFound(String),
    
    #[error("Node not found: {0}")]
    NodeNotFound(String),
}
