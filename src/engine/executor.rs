// ABOUTME: Orchestrator loop driving a workflow's tasks to completion
// ABOUTME: Bounded admission, worker spawning, and completion-driven context merges

use chrono::Utc;
use indexmap::IndexMap;
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::context::WorkflowContext;
use super::resolver;
use super::task::{Task, TaskStatus};
use crate::store::{RunStore, WORKFLOW_STEPS_TABLE};

/// Runs the tasks of one workflow. Admission, completion handling, and
/// context mutation all happen on the orchestrator's own async task;
/// workers only ever touch their private task clone and context snapshot.
pub(crate) struct Executor<'a> {
    store: &'a dyn RunStore,
    workflow_id: Option<i64>,
    step_ids: HashMap<String, i64>,
    warnings: Vec<String>,
}

impl<'a> Executor<'a> {
    pub(crate) fn new(store: &'a dyn RunStore, workflow_id: Option<i64>) -> Self {
        Self {
            store,
            workflow_id,
            step_ids: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn into_warnings(self) -> Vec<String> {
        self.warnings
    }

    /// Drive the task set until every task is terminal or the graph stalls.
    ///
    /// The loop admits ready tasks up to `max_parallel`, then blocks on the
    /// next worker completion instead of polling. When nothing is in flight
    /// and nothing can be admitted, remaining pending tasks are permanently
    /// blocked and the loop ends rather than hanging the caller.
    pub(crate) async fn run(
        &mut self,
        tasks: &mut IndexMap<String, Task>,
        context: &mut WorkflowContext,
        max_parallel: usize,
    ) {
        let max_parallel = max_parallel.max(1);
        let mut queue: VecDeque<String> = resolver::ready(tasks).into();
        let mut scheduled: HashSet<String> = queue.iter().cloned().collect();
        let mut in_flight: HashMap<tokio::task::Id, String> = HashMap::new();
        let mut workers: JoinSet<Task> = JoinSet::new();

        loop {
            while workers.len() < max_parallel {
                let Some(name) = queue.pop_front() else { break };
                self.dispatch(&name, tasks, context, &mut workers, &mut in_flight)
                    .await;
            }

            let Some(joined) = workers.join_next_with_id().await else {
                // Nothing running: either every task is terminal or the
                // remaining pending tasks can never become ready.
                break;
            };

            match joined {
                Ok((worker_id, finished)) => {
                    in_flight.remove(&worker_id);
                    self.complete(finished, tasks, context).await;
                }
                Err(join_error) => {
                    let name = in_flight.remove(&join_error.id()).unwrap_or_default();
                    error!(task = %name, %join_error, "worker terminated abnormally");
                    if let Some(task) = tasks.get_mut(&name) {
                        task.fail_abnormally(format!("worker terminated: {}", join_error));
                        self.update_step(&name, tasks).await;
                    }
                }
            }

            for name in resolver::ready(tasks) {
                if scheduled.insert(name.clone()) {
                    queue.push_back(name);
                }
            }
        }
    }

    async fn dispatch(
        &mut self,
        name: &str,
        tasks: &mut IndexMap<String, Task>,
        context: &WorkflowContext,
        workers: &mut JoinSet<Task>,
        in_flight: &mut HashMap<tokio::task::Id, String>,
    ) {
        let Some(task) = tasks.get_mut(name) else { return };
        task.mark_running();
        info!(task = %name, "dispatching task");

        self.create_step(name).await;

        let snapshot = context.clone();
        let handle = workers.spawn(task.clone().run_to_completion(snapshot));
        in_flight.insert(handle.id(), name.to_string());
    }

    /// Apply a finished worker's state on the orchestrator task: write the
    /// canonical record back, merge the result into the shared context under
    /// the task's name, and persist the updated step record.
    async fn complete(
        &mut self,
        finished: Task,
        tasks: &mut IndexMap<String, Task>,
        context: &mut WorkflowContext,
    ) {
        let name = finished.name().to_string();
        match finished.status() {
            TaskStatus::Completed => {
                if let Some(result) = finished.result() {
                    context.insert(name.clone(), result.clone());
                }
                info!(task = %name, attempts = finished.attempts(), "task completed");
            }
            TaskStatus::Failed => {
                warn!(
                    task = %name,
                    attempts = finished.attempts(),
                    error = finished.error().unwrap_or("unknown"),
                    "task failed"
                );
            }
            TaskStatus::Pending | TaskStatus::Running => {
                // Workers always return a terminal task.
                error!(task = %name, status = %finished.status(), "worker returned non-terminal task");
            }
        }

        if let Some(slot) = tasks.get_mut(&name) {
            *slot = finished;
        }
        self.update_step(&name, tasks).await;
    }

    async fn create_step(&mut self, name: &str) {
        let Some(workflow_id) = self.workflow_id else { return };
        let record = json!({
            "workflow_id": workflow_id,
            "task": name,
            "status": TaskStatus::Running.to_string(),
            "attempts": 0,
            "started_at": Utc::now(),
        });
        match self.store.create(WORKFLOW_STEPS_TABLE, record).await {
            Ok(step_id) => {
                self.step_ids.insert(name.to_string(), step_id);
            }
            Err(store_error) => {
                warn!(task = %name, error = %store_error, "failed to persist step record");
                self.warnings
                    .push(format!("step record for '{}' not persisted: {}", name, store_error));
            }
        }
    }

    async fn update_step(&mut self, name: &str, tasks: &IndexMap<String, Task>) {
        let Some(step_id) = self.step_ids.get(name).copied() else { return };
        let Some(task) = tasks.get(name) else { return };
        let fields = json!({
            "status": task.status().to_string(),
            "attempts": task.attempts(),
            "result": task.result(),
            "error": task.error(),
            "finished_at": Utc::now(),
        });
        if let Err(store_error) = self.store.update(WORKFLOW_STEPS_TABLE, step_id, fields).await {
            warn!(task = %name, error = %store_error, "failed to update step record");
            self.warnings
                .push(format!("step update for '{}' not persisted: {}", name, store_error));
        }
    }
}
