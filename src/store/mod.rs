// ABOUTME: Run store boundary for durable workflow and step audit records
// ABOUTME: Trait consumed by the engine plus the bundled in-memory implementation

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::engine::error::StoreError;

/// Logical table holding one record per workflow run.
pub const WORKFLOWS_TABLE: &str = "workflows";
/// Logical table holding one record per dispatched task within a run.
pub const WORKFLOW_STEPS_TABLE: &str = "workflow_steps";

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable record storage consumed by the engine. The engine only relies on
/// id-assigned creation, field-merge updates, and equality-filtered reads;
/// everything else about the schema is the store's concern. Implementations
/// must tolerate concurrent writes from multiple workflow runs.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Insert a JSON object record, returning its store-assigned id.
    async fn create(&self, table: &str, record: Value) -> StoreResult<i64>;

    /// Merge the given fields into an existing record. Returns false when
    /// the record does not exist.
    async fn update(&self, table: &str, id: i64, fields: Value) -> StoreResult<bool>;

    /// Rows whose fields equal every entry of `filter` (a JSON object;
    /// null matches everything), in insertion order. A `limit` of zero
    /// means unbounded.
    async fn query(&self, table: &str, filter: Value, limit: usize) -> StoreResult<Vec<Value>>;
}

pub use memory::MemoryRunStore;
