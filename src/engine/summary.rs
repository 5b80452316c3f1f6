// ABOUTME: Run summary types returned by workflow execution
// ABOUTME: Aggregates per-task reports, final context values, and persistence warnings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use super::task::{Task, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl WorkflowStatus {
    /// Aggregate status, evaluated once the run loop has ended. A run is
    /// failed if any task failed, or if tasks never reached a terminal
    /// state (stalled graph); otherwise completed.
    pub fn from_tasks<'a>(tasks: impl Iterator<Item = &'a Task>) -> Self {
        let mut status = WorkflowStatus::Completed;
        for task in tasks {
            match task.status() {
                TaskStatus::Failed => return WorkflowStatus::Failed,
                TaskStatus::Completed => {}
                TaskStatus::Pending | TaskStatus::Running => status = WorkflowStatus::Failed,
            }
        }
        status
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStatus::Pending => write!(f, "pending"),
            WorkflowStatus::Running => write!(f, "running"),
            WorkflowStatus::Completed => write!(f, "completed"),
            WorkflowStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Per-task detail included in a run summary.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub name: String,
    pub status: TaskStatus,
    pub attempts: u32,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl From<&Task> for TaskReport {
    fn from(task: &Task) -> Self {
        Self {
            name: task.name().to_string(),
            status: task.status(),
            attempts: task.attempts(),
            start_time: task.start_time(),
            end_time: task.end_time(),
            error: task.error().map(str::to_string),
        }
    }
}

/// Structured result of a workflow run. There is no thrown error for a
/// failed run; callers inspect `status` and the per-task reports.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Store-assigned run id, absent when the workflow record write failed.
    pub id: Option<i64>,
    pub workflow: String,
    pub status: WorkflowStatus,
    /// Task reports in workflow insertion order.
    pub tasks: Vec<TaskReport>,
    /// Final context values: task results keyed by task name, plus any
    /// caller-seeded keys.
    pub results: HashMap<String, Value>,
    /// Non-fatal problems observed during the run, including persistence
    /// write failures and permanently-blocked tasks.
    pub warnings: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn task(&self, name: &str) -> Option<&TaskReport> {
        self.tasks.iter().find(|report| report.name == name)
    }

    pub fn completed_tasks(&self) -> usize {
        self.tasks
            .iter()
            .filter(|report| report.status == TaskStatus::Completed)
            .count()
    }

    pub fn failed_tasks(&self) -> usize {
        self.tasks
            .iter()
            .filter(|report| report.status == TaskStatus::Failed)
            .count()
    }
}
