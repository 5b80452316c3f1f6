// ABOUTME: Workflow orchestration engine core
// ABOUTME: Task model, dependency resolution, executor loop, and run summaries

pub mod context;
pub mod error;
mod executor;
pub mod resolver;
pub mod summary;
pub mod task;
pub mod workflow;

pub use context::WorkflowContext;
pub use error::{ExecutionError, StoreError};
pub use summary::{RunSummary, TaskReport, WorkflowStatus};
pub use task::{Task, TaskOutput, TaskStatus};
pub use workflow::Workflow;
