// ABOUTME: Error types for workflow orchestration operations
// ABOUTME: Defines engine-level and run-store error variants

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Duplicate task name: {name}")]
    DuplicateTask { name: String },

    #[error("Duplicate workflow name: {name}")]
    DuplicateWorkflow { name: String },

    #[error("Task not found: {name}")]
    TaskNotFound { name: String },

    #[error("Workflow not found: {name}")]
    WorkflowNotFound { name: String },

    #[error("Workflow run not found: {id}")]
    RunNotFound { id: i64 },

    #[error("Circular dependency detected: {tasks:?}")]
    CircularDependency { tasks: Vec<String> },

    #[error("Run store error: {0}")]
    StoreError(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record is not a JSON object")]
    InvalidRecord,

    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    #[error("Query failed: {message}")]
    QueryFailed { message: String },
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
