// ABOUTME: Task model: a named, retryable unit of work with declared dependencies
// ABOUTME: Wraps a typed async function and tracks per-run execution state

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::debug;

use super::context::WorkflowContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of a single task function invocation. The error side is the
/// message recorded on the task; panics are converted to the same shape.
pub type TaskOutput = std::result::Result<Value, String>;

pub type TaskFuture = BoxFuture<'static, TaskOutput>;

type TaskFn = Arc<dyn Fn(WorkflowContext) -> TaskFuture + Send + Sync>;

/// A named unit of work with declared dependencies, a retry budget, and
/// mutable run state. Extra parameters beyond the shared context are
/// captured by the closure at construction time.
#[derive(Clone)]
pub struct Task {
    name: String,
    dependencies: Vec<String>,
    timeout: Option<Duration>,
    retry_count: u32,
    retry_delay: Duration,
    runner: TaskFn,
    status: TaskStatus,
    result: Option<Value>,
    error: Option<String>,
    attempts: u32,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(WorkflowContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskOutput> + Send + 'static,
    {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            timeout: None,
            retry_count: 0,
            retry_delay: Duration::from_secs(1),
            runner: Arc::new(move |context| func(context).boxed()),
            status: TaskStatus::Pending,
            result: None,
            error: None,
            attempts: 0,
            start_time: None,
            end_time: None,
        }
    }

    /// Declare the task names this task waits on.
    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Enforce a hard per-attempt deadline. Expiry fails the attempt and
    /// consumes retry budget like any other failure.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Allow up to `retry_count` re-invocations after a failed attempt,
    /// each separated by the fixed `retry_delay`.
    pub fn with_retries(mut self, retry_count: u32, retry_delay: Duration) -> Self {
        self.retry_count = retry_count;
        self.retry_delay = retry_delay;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub(crate) fn mark_running(&mut self) {
        self.status = TaskStatus::Running;
    }

    pub(crate) fn fail_abnormally(&mut self, message: String) {
        self.status = TaskStatus::Failed;
        self.error = Some(message);
        self.attempts = self.attempts.max(1);
        self.end_time = Some(Utc::now());
    }

    /// Run one attempt of the task function against the given context.
    ///
    /// Sets status to running, increments the attempt counter, invokes the
    /// stored function, and records the result or error text along with
    /// start/end timestamps. Panics inside the function are caught and
    /// recorded as a failed attempt.
    pub async fn execute(&mut self, context: &WorkflowContext) {
        self.status = TaskStatus::Running;
        self.attempts += 1;
        if self.start_time.is_none() {
            self.start_time = Some(Utc::now());
        }

        let attempt = AssertUnwindSafe((self.runner)(context.clone())).catch_unwind();
        let outcome = match self.timeout {
            Some(limit) => match timeout(limit, attempt).await {
                Ok(outcome) => outcome,
                Err(_) => Ok(Err(format!("timed out after {:?}", limit))),
            },
            None => attempt.await,
        };

        match outcome {
            Ok(Ok(value)) => {
                self.result = Some(value);
                self.error = None;
                self.status = TaskStatus::Completed;
            }
            Ok(Err(message)) => {
                self.error = Some(message);
                self.status = TaskStatus::Failed;
            }
            Err(panic) => {
                self.error = Some(panic_message(panic));
                self.status = TaskStatus::Failed;
            }
        }
        self.end_time = Some(Utc::now());
    }

    fn can_retry(&self) -> bool {
        self.status == TaskStatus::Failed && self.attempts <= self.retry_count
    }

    /// Full attempt-and-retry cycle, run inside a single worker slot. The
    /// fixed retry delay counts against that slot, so from the orchestrator's
    /// perspective the task is running until retries are exhausted.
    pub(crate) async fn run_to_completion(mut self, context: WorkflowContext) -> Self {
        loop {
            self.execute(&context).await;
            if !self.can_retry() {
                break;
            }
            debug!(
                task = %self.name,
                attempt = self.attempts,
                delay = ?self.retry_delay,
                "retrying failed task"
            );
            sleep(self.retry_delay).await;
        }
        self
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("status", &self.status)
            .field("attempts", &self.attempts)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("task panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("task panicked: {}", message)
    } else {
        "task panicked".to_string()
    }
}
