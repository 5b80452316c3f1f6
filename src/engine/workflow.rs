// ABOUTME: Workflow aggregate: a named task set sharing a context and parallelism bound
// ABOUTME: Owns the run lifecycle from pending through terminal status

use chrono::Utc;
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

use super::context::WorkflowContext;
use super::error::{ExecutionError, Result};
use super::executor::Executor;
use super::resolver;
use super::summary::{RunSummary, TaskReport, WorkflowStatus};
use super::task::Task;
use crate::store::{RunStore, WORKFLOWS_TABLE};

/// An aggregate of tasks sharing a context map and a parallelism bound.
/// Mutated only by its own `execute` call; concurrent `execute` invocations
/// on the same workflow are not supported.
#[derive(Debug)]
pub struct Workflow {
    name: String,
    description: String,
    context: WorkflowContext,
    tasks: IndexMap<String, Task>,
    max_parallel_tasks: usize,
    status: WorkflowStatus,
    id: Option<i64>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, description: impl Into<String>, max_parallel_tasks: usize) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            context: WorkflowContext::new(),
            tasks: IndexMap::new(),
            max_parallel_tasks,
            status: WorkflowStatus::Pending,
            id: None,
        }
    }

    /// Seed the shared context with caller-provided keys.
    pub fn with_context(mut self, seed: HashMap<String, Value>) -> Self {
        self.context = WorkflowContext::seeded(seed);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    /// Store-assigned run id, present once `execute` has persisted the
    /// workflow record.
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn max_parallel_tasks(&self) -> usize {
        self.max_parallel_tasks
    }

    pub fn context(&self) -> &WorkflowContext {
        &self.context
    }

    /// Register a task. Duplicate names are rejected rather than silently
    /// overwritten.
    pub fn add_task(&mut self, task: Task) -> Result<()> {
        if self.tasks.contains_key(task.name()) {
            return Err(ExecutionError::DuplicateTask {
                name: task.name().to_string(),
            });
        }
        self.tasks.insert(task.name().to_string(), task);
        Ok(())
    }

    pub fn get_task(&self, name: &str) -> Result<&Task> {
        self.tasks
            .get(name)
            .ok_or_else(|| ExecutionError::TaskNotFound {
                name: name.to_string(),
            })
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Task names in insertion order (not execution order).
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    /// Run every task to a terminal state and return the structured summary.
    ///
    /// Blocks until the whole graph is terminal or permanently stalled;
    /// per-task failures are recorded on the tasks, never raised. The only
    /// error cases are structural (cyclic graph) or a failing status read,
    /// not a failed run.
    #[instrument(skip(self, store), fields(workflow = %self.name))]
    pub async fn execute(&mut self, store: &dyn RunStore) -> Result<RunSummary> {
        resolver::check_cycles(&self.tasks)?;

        let started_at = Utc::now();
        self.status = WorkflowStatus::Running;
        let mut warnings = Vec::new();

        info!(tasks = self.tasks.len(), max_parallel = self.max_parallel_tasks, "starting workflow run");

        let record = json!({
            "name": self.name,
            "description": self.description,
            "status": WorkflowStatus::Running.to_string(),
            "task_count": self.tasks.len(),
            "started_at": started_at,
        });
        self.id = match store.create(WORKFLOWS_TABLE, record).await {
            Ok(id) => Some(id),
            Err(store_error) => {
                warn!(error = %store_error, "failed to persist workflow record");
                warnings.push(format!("workflow record not persisted: {}", store_error));
                None
            }
        };

        let mut executor = Executor::new(store, self.id);
        executor
            .run(&mut self.tasks, &mut self.context, self.max_parallel_tasks)
            .await;
        warnings.extend(executor.into_warnings());

        for (task, reason) in resolver::blocked(&self.tasks) {
            warn!(task = %task, %reason, "task never became ready");
            warnings.push(format!("task '{}' never became ready: {}", task, reason));
        }

        self.status = WorkflowStatus::from_tasks(self.tasks.values());
        let finished_at = Utc::now();

        if let Some(id) = self.id {
            let fields = json!({
                "status": self.status.to_string(),
                "finished_at": finished_at,
            });
            if let Err(store_error) = store.update(WORKFLOWS_TABLE, id, fields).await {
                warn!(error = %store_error, "failed to update workflow record");
                warnings.push(format!("workflow record update not persisted: {}", store_error));
            }
        }

        info!(status = %self.status, "workflow run finished");

        Ok(RunSummary {
            id: self.id,
            workflow: self.name.clone(),
            status: self.status,
            tasks: self.tasks.values().map(TaskReport::from).collect(),
            results: self.context.values().clone(),
            warnings,
            started_at,
            finished_at,
        })
    }
}
