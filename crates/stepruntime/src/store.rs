use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stepcore::{Result, WorkflowDefinition, WorkflowError, WorkflowId};
use tokio::sync::RwLock;
use uuid::Uuid;

/// A saved workflow definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredWorkflow {
    pub id: WorkflowId,
    pub owner: String,
    pub name: Option<String>,
    pub workflow: WorkflowDefinition,
    pub created_at: DateTime<Utc>,
}

/// Listing entry without the definition body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub id: WorkflowId,
    pub owner: String,
    pub name: Option<String>,
    pub nodes: usize,
    pub edges: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&StoredWorkflow> for WorkflowSummary {
    fn from(stored: &StoredWorkflow) -> Self {
        Self {
            id: stored.id,
            owner: stored.owner.clone(),
            name: stored.name.clone(),
            nodes: stored.workflow.nodes.len(),
            edges: stored.workflow.edges.len(),
            created_at: stored.created_at,
        }
    }
}

/// Persistence for workflow definitions
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    async fn get(&self, id: WorkflowId) -> Result<StoredWorkflow>;
    
    async fn put(
        &self,
        owner: &str,
        name: Option<String>,
        workflow: WorkflowDefinition,
    ) -> Result<WorkflowId>;
    
    /// Summaries of one owner's workflows, newest first
    async fn list(&self, owner: &str) -> Result<Vec<WorkflowSummary>>;
}

/// Process-local store; contents are lost on restart
#[derive(Default)]
pub struct InMemoryDefinitionStore {
    workflows: RwLock<Vec<StoredWorkflow>>,
}

impl InMemoryDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DefinitionStore for InMemoryDefinitionStore {
    async fn get(&self, id: WorkflowId) -> Result<StoredWorkflow> {
        let workflows = self.workflows.read().await;
        workflows
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()).into())
    }
    
    async fn put(
        &self,
        owner: &str,
        name: Option<String>,
        workflow: WorkflowDefinition,
    ) -> Result<WorkflowId> {
        let id = Uuid::new_v4();
        tracing::info!("Storing workflow {} for owner '{}'", id, owner);
        self.workflows.write().await.push(StoredWorkflow {
            id,
            owner: owner.to_string(),
            name,
            workflow,
            created_at: Utc::now(),
        });
        Ok(id)
    }
    
    async fn list(&self, owner: &str) -> Result<Vec<WorkflowSummary>> {
        let workflows = self.workflows.read().await;
        Ok(workflows
            .iter()
            .rev()
            .filter(|w| w.owner == owner)
            .map(WorkflowSummary::from)
            .collect())
    }
}
