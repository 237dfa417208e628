//! Workflow execution runtime
//! 
//! This crate validates workflow graphs, resolves templated configuration
//! and walks the graph one node at a time, dispatching each node to its
//! registered handler.

mod executor;
pub mod graph;
mod loader;
mod registry;
mod runtime;
mod store;
pub mod template;

pub use executor::{RunInput, WorkflowExecutor};
pub use graph::{choose_next, ValidatedWorkflow};
pub use loader::{load_definition, load_definitions_dir};
pub use registry::NodeRegistry;
pub use runtime::{FlowRuntime, RuntimeConfig};
pub use store::{DefinitionStore, InMemoryDefinitionStore, StoredWorkflow, WorkflowSummary};
pub use template::{resolve_str, resolve_templates};
