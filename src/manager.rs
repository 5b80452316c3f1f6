// ABOUTME: Process-wide registry and front door for workflow lifecycle operations
// ABOUTME: Creation, execution, persisted status lookup, and run-history listing

use serde_json::{json, Value};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::engine::error::{ExecutionError, Result};
use crate::engine::{RunSummary, Task, Workflow};
use crate::store::{MemoryRunStore, RunStore, WORKFLOWS_TABLE, WORKFLOW_STEPS_TABLE};

/// Registry of named workflows sharing one run store. Constructed
/// explicitly and passed around; there is no global instance.
pub struct WorkflowManager {
    workflows: HashMap<String, Workflow>,
    store: Arc<dyn RunStore>,
}

impl WorkflowManager {
    pub fn new(store: Arc<dyn RunStore>) -> Self {
        Self {
            workflows: HashMap::new(),
            store,
        }
    }

    /// Convenience constructor backed by the in-memory store.
    pub fn with_memory_store() -> Self {
        Self::new(Arc::new(MemoryRunStore::new()))
    }

    pub fn store(&self) -> Arc<dyn RunStore> {
        Arc::clone(&self.store)
    }

    /// Register a new workflow. A name collision is a caller error, not a
    /// silent replacement.
    pub fn create_workflow(
        &mut self,
        name: &str,
        description: &str,
        tasks: Vec<Task>,
        context: HashMap<String, Value>,
        max_parallel_tasks: usize,
    ) -> Result<&Workflow> {
        let Entry::Vacant(slot) = self.workflows.entry(name.to_string()) else {
            return Err(ExecutionError::DuplicateWorkflow {
                name: name.to_string(),
            });
        };

        let mut workflow = Workflow::new(name, description, max_parallel_tasks).with_context(context);
        for task in tasks {
            workflow.add_task(task)?;
        }

        info!(workflow = name, tasks = workflow.task_count(), "registered workflow");
        Ok(slot.insert(workflow))
    }

    pub fn get_workflow(&self, name: &str) -> Option<&Workflow> {
        self.workflows.get(name)
    }

    pub fn get_workflow_mut(&mut self, name: &str) -> Option<&mut Workflow> {
        self.workflows.get_mut(name)
    }

    /// Execute a registered workflow to completion. An unregistered name is
    /// a `WorkflowNotFound` error, distinct from a run that ends failed.
    pub async fn execute_workflow(&mut self, name: &str) -> Result<RunSummary> {
        let store = Arc::clone(&self.store);
        let workflow =
            self.workflows
                .get_mut(name)
                .ok_or_else(|| ExecutionError::WorkflowNotFound {
                    name: name.to_string(),
                })?;
        workflow.execute(store.as_ref()).await
    }

    /// Merge the persisted workflow record with its step records, in
    /// dispatch order, into one status document.
    pub async fn get_workflow_status(&self, id: i64) -> Result<Value> {
        let rows = self
            .store
            .query(WORKFLOWS_TABLE, json!({ "id": id }), 1)
            .await?;
        let Some(mut workflow_row) = rows.into_iter().next() else {
            return Err(ExecutionError::RunNotFound { id });
        };

        let steps = self
            .store
            .query(WORKFLOW_STEPS_TABLE, json!({ "workflow_id": id }), 0)
            .await?;

        if let Value::Object(ref mut fields) = workflow_row {
            fields.insert("steps".to_string(), Value::Array(steps));
        }
        Ok(workflow_row)
    }

    /// Persisted run records, most recent first. A `limit` of zero means
    /// unbounded.
    pub async fn list_workflows(&self, limit: usize) -> Result<Vec<Value>> {
        let mut rows = self.store.query(WORKFLOWS_TABLE, Value::Null, 0).await?;
        rows.reverse();
        if limit > 0 {
            rows.truncate(limit);
        }
        Ok(rows)
    }
}
