// ABOUTME: Integration tests for the workflow manager and run store boundary
// ABOUTME: Covers registration, persisted status lookup, listing, and write-failure handling

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use switchyard::engine::error::StoreError;
use switchyard::engine::{ExecutionError, TaskStatus, WorkflowStatus};
use switchyard::store::{RunStore, StoreResult};
use switchyard::WorkflowManager;

mod common;
use common::{chained_task, init_tracing, ok_task};

#[tokio::test]
async fn test_full_lifecycle_through_manager() {
    init_tracing();
    let mut manager = WorkflowManager::with_memory_store();

    let mut seed = HashMap::new();
    seed.insert("keyword".to_string(), json!("vintage poster"));

    manager
        .create_workflow(
            "listing-pipeline",
            "keyword to published listing",
            vec![ok_task("design", "design-ready"), chained_task("mockup", "design")],
            seed,
            2,
        )
        .unwrap();

    let summary = manager.execute_workflow("listing-pipeline").await.unwrap();
    assert_eq!(summary.status, WorkflowStatus::Completed);
    assert_eq!(summary.task("mockup").unwrap().status, TaskStatus::Completed);
    // caller-seeded keys survive alongside task results
    assert_eq!(summary.results.get("keyword"), Some(&json!("vintage poster")));

    let run_id = summary.id.unwrap();
    let status = manager.get_workflow_status(run_id).await.unwrap();
    assert_eq!(status["name"], json!("listing-pipeline"));
    assert_eq!(status["status"], json!("completed"));

    let steps = status["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0]["task"], json!("design"));
    assert_eq!(steps[1]["task"], json!("mockup"));
}

#[tokio::test]
async fn test_execute_workflow_not_found() {
    init_tracing();
    let mut manager = WorkflowManager::with_memory_store();
    let result = manager.execute_workflow("unregistered").await;
    assert!(matches!(
        result,
        Err(ExecutionError::WorkflowNotFound { .. })
    ));
}

#[tokio::test]
async fn test_list_workflows_newest_first_with_limit() {
    init_tracing();
    let mut manager = WorkflowManager::with_memory_store();

    manager
        .create_workflow("first-run", "", vec![ok_task("a", "1")], HashMap::new(), 1)
        .unwrap();
    manager
        .create_workflow("second-run", "", vec![ok_task("b", "2")], HashMap::new(), 1)
        .unwrap();

    manager.execute_workflow("first-run").await.unwrap();
    manager.execute_workflow("second-run").await.unwrap();

    let all = manager.list_workflows(0).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0]["name"], json!("second-run"));
    assert_eq!(all[1]["name"], json!("first-run"));

    let capped = manager.list_workflows(1).await.unwrap();
    assert_eq!(capped.len(), 1);
    assert_eq!(capped[0]["name"], json!("second-run"));
}

/// Store whose writes always fail, for exercising the non-fatal
/// persistence path.
struct FailingStore;

#[async_trait]
impl RunStore for FailingStore {
    async fn create(&self, _table: &str, _record: Value) -> StoreResult<i64> {
        Err(StoreError::WriteFailed {
            message: "disk full".to_string(),
        })
    }

    async fn update(&self, _table: &str, _id: i64, _fields: Value) -> StoreResult<bool> {
        Err(StoreError::WriteFailed {
            message: "disk full".to_string(),
        })
    }

    async fn query(&self, _table: &str, _filter: Value, _limit: usize) -> StoreResult<Vec<Value>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_persistence_failure_is_non_fatal() {
    init_tracing();
    let mut manager = WorkflowManager::new(Arc::new(FailingStore));
    manager
        .create_workflow(
            "unpersisted",
            "",
            vec![ok_task("a", "1"), chained_task("b", "a")],
            HashMap::new(),
            2,
        )
        .unwrap();

    let summary = manager.execute_workflow("unpersisted").await.unwrap();

    // the run itself succeeds; only the audit trail is lost
    assert_eq!(summary.status, WorkflowStatus::Completed);
    assert_eq!(summary.completed_tasks(), 2);
    assert!(summary.id.is_none());
    assert!(summary
        .warnings
        .iter()
        .any(|warning| warning.contains("not persisted")));
}

#[tokio::test]
async fn test_tasks_can_be_added_after_creation() {
    init_tracing();
    let mut manager = WorkflowManager::with_memory_store();
    manager
        .create_workflow("grow", "", vec![ok_task("seed", "s")], HashMap::new(), 2)
        .unwrap();

    let workflow = manager.get_workflow_mut("grow").unwrap();
    workflow.add_task(chained_task("sprout", "seed")).unwrap();

    let summary = manager.execute_workflow("grow").await.unwrap();
    assert_eq!(summary.status, WorkflowStatus::Completed);
    assert_eq!(summary.results.get("sprout"), Some(&json!("ok-sprout:s")));
}
