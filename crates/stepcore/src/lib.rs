//! Core abstractions for the step engine
//! 
//! This crate provides the workflow data model, run state, the handler
//! trait and the error taxonomy. It contains no execution logic.

mod error;
pub mod events;
mod node;
mod state;
mod value;
mod workflow;

pub use error::{FlowError, NodeError, WorkflowError};
pub use node::{ConfigField, Node, NodeContext, NodeMetadata, NodeOutput};
pub use state::{HaltReason, RunResult, RunState, StepLog, StepStatus};
pub use value::{Map, Value, ValueExt};
pub use workflow::{
    Edge, NodeId, NodeSpec, WorkflowDefinition, WorkflowId,
    END_NODE_TYPE, TRIGGER_NAMESPACE,
};
pub use events::*;

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
