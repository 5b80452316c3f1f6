// ABOUTME: In-memory run store used as the default backing and in tests
// ABOUTME: Id-keyed JSON rows behind a tokio RwLock with monotonic id assignment

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use super::{RunStore, StoreResult};
use crate::engine::error::StoreError;

/// In-memory `RunStore`. Rows live in per-table maps ordered by id, so
/// insertion order falls out of the id sequence. Ids are assigned from a
/// single counter shared across tables.
#[derive(Debug, Default)]
pub struct MemoryRunStore {
    tables: RwLock<HashMap<String, BTreeMap<i64, Value>>>,
    next_id: AtomicI64,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn create(&self, table: &str, record: Value) -> StoreResult<i64> {
        let Value::Object(mut fields) = record else {
            return Err(StoreError::InvalidRecord);
        };
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        fields.insert("id".to_string(), json!(id));

        let mut tables = self.tables.write().await;
        tables
            .entry(table.to_string())
            .or_default()
            .insert(id, Value::Object(fields));
        Ok(id)
    }

    async fn update(&self, table: &str, id: i64, fields: Value) -> StoreResult<bool> {
        let Value::Object(updates) = fields else {
            return Err(StoreError::InvalidRecord);
        };

        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(false);
        };
        let Some(Value::Object(row)) = rows.get_mut(&id) else {
            return Ok(false);
        };
        for (key, value) in updates {
            row.insert(key, value);
        }
        Ok(true)
    }

    async fn query(&self, table: &str, filter: Value, limit: usize) -> StoreResult<Vec<Value>> {
        let filter = match filter {
            Value::Object(fields) => fields,
            Value::Null => serde_json::Map::new(),
            _ => return Err(StoreError::QueryFailed {
                message: "filter must be a JSON object or null".to_string(),
            }),
        };

        let tables = self.tables.read().await;
        let Some(rows) = tables.get(table) else {
            return Ok(Vec::new());
        };

        let mut matches = Vec::new();
        for row in rows.values() {
            let matched = filter
                .iter()
                .all(|(key, expected)| row.get(key) == Some(expected));
            if matched {
                matches.push(row.clone());
                if limit > 0 && matches.len() == limit {
                    break;
                }
            }
        }
        Ok(matches)
    }
}
