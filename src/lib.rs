// ABOUTME: Main library module for the switchyard orchestration engine
// ABOUTME: Exports the engine core, run store boundary, and workflow manager

pub mod engine;
pub mod manager;
pub mod store;

// Re-export commonly used types
pub use engine::{
    ExecutionError, RunSummary, Task, TaskReport, TaskStatus, Workflow, WorkflowContext,
    WorkflowStatus,
};
pub use manager::WorkflowManager;
pub use store::{MemoryRunStore, RunStore};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
