//! Persistence adapter contract consumed by the CRUD routes, plus the bundled backends.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgDocumentStore};

use crate::error::StoreError;
use crate::value::value_eq;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// One stored record.
pub type Document = Map<String, Value>;

/// Uniform document operations keyed by an arbitrary equality query.
///
/// Query fields whose value is null mean "no constraint on this field", never "match null".
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// True when the backend assigns integer `id`s itself on create.
    fn supports_auto_increment_id(&self) -> bool {
        false
    }

    /// Prepare storage for a resource. Idempotent.
    async fn ensure_collection(&self, _resource: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError>;

    async fn get_one(&self, resource: &str, query: &Document) -> Result<Option<Document>, StoreError>;

    async fn get_many(&self, resource: &str, query: &Document) -> Result<Vec<Document>, StoreError>;

    /// Store `record` and return it as stored.
    async fn create(&self, resource: &str, record: Document) -> Result<Document, StoreError>;

    /// Merge `partial` into the first record matching `query`. Returns the number of matched records.
    async fn update_one(&self, resource: &str, query: &Document, partial: &Document) -> Result<u64, StoreError>;

    /// Delete the first record matching `query`. Returns the number of deleted records.
    async fn delete_one(&self, resource: &str, query: &Document) -> Result<u64, StoreError>;

    /// Atomically increment the counter named `counter` (creating it at 1) and return the new value.
    async fn increment_and_fetch(&self, counter: &str) -> Result<i64, StoreError>;

    /// Current counter value without changing it.
    async fn current_counter(&self, counter: &str) -> Result<Option<i64>, StoreError>;

    async fn get_by_id(&self, resource: &str, id: i64) -> Result<Option<Document>, StoreError> {
        self.get_one(resource, &id_query(id)).await
    }

    async fn update_by_id(&self, resource: &str, id: i64, partial: &Document) -> Result<u64, StoreError> {
        self.update_one(resource, &id_query(id), partial).await
    }

    async fn delete_by_id(&self, resource: &str, id: i64) -> Result<u64, StoreError> {
        self.delete_one(resource, &id_query(id)).await
    }
}

pub fn id_query(id: i64) -> Document {
    let mut q = Map::new();
    q.insert("id".into(), Value::Number(id.into()));
    q
}

/// Drop null-valued constraints from a query.
pub fn effective_query(query: &Document) -> Document {
    query
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// True when every non-null constraint in `query` equals the record's value as a whole.
pub fn matches_query(record: &Document, query: &Document) -> bool {
    query
        .iter()
        .filter(|(_, v)| !v.is_null())
        .all(|(k, v)| record.get(k).map(|r| value_eq(r, v)).unwrap_or(false))
}
