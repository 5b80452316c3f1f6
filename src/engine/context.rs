// ABOUTME: Shared workflow context mapping task names to result values
// ABOUTME: Snapshots are handed to workers; only the orchestrator writes the canonical copy

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Shared mapping of task name (and caller-seeded keys) to result values.
///
/// The canonical context lives on the workflow and is mutated exclusively by
/// the orchestrator loop after a worker is observed complete. Workers receive
/// a clone taken at dispatch time, so a dependent task sees its dependency's
/// result exactly when the dependency has completed and been merged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowContext {
    values: HashMap<String, Value>,
}

impl WorkflowContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context pre-populated with caller-provided keys.
    pub fn seeded(values: HashMap<String, Value>) -> Self {
        Self { values }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Convenience accessor for string-valued results.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> HashMap<String, Value> {
        self.values
    }
}
