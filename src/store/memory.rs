//! In-process document store. Used for tests and for running without a database.

use super::{matches_query, Document, PersistenceAdapter};
use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

#[derive(Default)]
struct Collections {
    records: HashMap<String, Vec<Document>>,
    /// Last id handed out per collection when native ids are on.
    sequences: HashMap<String, i64>,
}

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    counters: Mutex<HashMap<String, i64>>,
    native_ids: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that assigns `id` itself on create, like a table with an auto-increment key.
    pub fn with_native_ids() -> Self {
        MemoryStore {
            native_ids: true,
            ..Self::default()
        }
    }

    /// Number of records currently held for `resource`.
    pub fn count(&self, resource: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.records.get(resource).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn supports_auto_increment_id(&self) -> bool {
        self.native_ids
    }

    async fn ensure_collection(&self, resource: &str) -> Result<(), StoreError> {
        let mut c = self.collections.write().map_err(|_| StoreError::Lock("collections"))?;
        c.records.entry(resource.to_string()).or_default();
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.collections.read().map(|_| ()).map_err(|_| StoreError::Lock("collections"))
    }

    async fn get_one(&self, resource: &str, query: &Document) -> Result<Option<Document>, StoreError> {
        let c = self.collections.read().map_err(|_| StoreError::Lock("collections"))?;
        Ok(c.records
            .get(resource)
            .and_then(|rows| rows.iter().find(|r| matches_query(r, query)))
            .cloned())
    }

    async fn get_many(&self, resource: &str, query: &Document) -> Result<Vec<Document>, StoreError> {
        let c = self.collections.read().map_err(|_| StoreError::Lock("collections"))?;
        Ok(c.records
            .get(resource)
            .map(|rows| rows.iter().filter(|r| matches_query(r, query)).cloned().collect())
            .unwrap_or_default())
    }

    async fn create(&self, resource: &str, mut record: Document) -> Result<Document, StoreError> {
        let mut c = self.collections.write().map_err(|_| StoreError::Lock("collections"))?;
        if self.native_ids {
            let seq = c.sequences.entry(resource.to_string()).or_insert(0);
            match record.get("id").and_then(Value::as_i64) {
                Some(given) => *seq = (*seq).max(given),
                None => {
                    *seq += 1;
                    record.insert("id".into(), Value::Number((*seq).into()));
                }
            }
        }
        c.records.entry(resource.to_string()).or_default().push(record.clone());
        tracing::debug!(resource, "memory insert");
        Ok(record)
    }

    async fn update_one(&self, resource: &str, query: &Document, partial: &Document) -> Result<u64, StoreError> {
        let mut c = self.collections.write().map_err(|_| StoreError::Lock("collections"))?;
        let Some(row) = c
            .records
            .get_mut(resource)
            .and_then(|rows| rows.iter_mut().find(|r| matches_query(r, query)))
        else {
            return Ok(0);
        };
        for (k, v) in partial {
            row.insert(k.clone(), v.clone());
        }
        Ok(1)
    }

    async fn delete_one(&self, resource: &str, query: &Document) -> Result<u64, StoreError> {
        let mut c = self.collections.write().map_err(|_| StoreError::Lock("collections"))?;
        let Some(rows) = c.records.get_mut(resource) else {
            return Ok(0);
        };
        match rows.iter().position(|r| matches_query(r, query)) {
            Some(pos) => {
                rows.remove(pos);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn increment_and_fetch(&self, counter: &str) -> Result<i64, StoreError> {
        let mut counters = self.counters.lock().map_err(|_| StoreError::Lock("counters"))?;
        let value = counters.entry(counter.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn current_counter(&self, counter: &str) -> Result<Option<i64>, StoreError> {
        let counters = self.counters.lock().map_err(|_| StoreError::Lock("counters"))?;
        Ok(counters.get(counter).copied())
    }
}
