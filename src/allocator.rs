//! Per-resource integer ids for backends without native auto-increment.
//!
//! All exclusion is delegated to the adapter's atomic increment-and-fetch; the allocator holds no
//! state of its own. An id handed out for a create that never completes is left as a gap.

use crate::error::AppError;
use crate::store::PersistenceAdapter;
use std::sync::Arc;

#[derive(Clone)]
pub struct IdAllocator {
    store: Arc<dyn PersistenceAdapter>,
}

impl IdAllocator {
    pub fn new(store: Arc<dyn PersistenceAdapter>) -> Self {
        IdAllocator { store }
    }

    /// Next id for `collection`: 1 on first use, then exactly one more than the last value handed out.
    pub async fn next_id(&self, collection: &str) -> Result<i64, AppError> {
        let id = self
            .store
            .increment_and_fetch(collection)
            .await
            .map_err(AppError::Allocation)?;
        tracing::debug!(collection, id, "allocated id");
        Ok(id)
    }

    /// Last allocated id, for diagnostics only. Not safe to allocate from.
    pub async fn current_id(&self, collection: &str) -> Result<Option<i64>, AppError> {
        self.store
            .current_counter(collection)
            .await
            .map_err(AppError::Allocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::{Document, MemoryStore};
    use async_trait::async_trait;
    use std::collections::HashSet;

    #[tokio::test]
    async fn concurrent_allocation_yields_one_to_n() {
        let allocator = IdAllocator::new(Arc::new(MemoryStore::new()));
        let mut handles = Vec::new();
        for _ in 0..200 {
            let a = allocator.clone();
            handles.push(tokio::spawn(async move { a.next_id("orders").await.unwrap() }));
        }
        let mut seen = HashSet::new();
        for h in handles {
            assert!(seen.insert(h.await.unwrap()));
        }
        assert_eq!(seen, (1..=200).collect::<HashSet<i64>>());
        assert_eq!(allocator.next_id("orders").await.unwrap(), 201);
        assert_eq!(allocator.current_id("orders").await.unwrap(), Some(201));
    }

    #[tokio::test]
    async fn collections_are_independent() {
        let allocator = IdAllocator::new(Arc::new(MemoryStore::new()));
        assert_eq!(allocator.current_id("order").await.unwrap(), None);
        assert_eq!(allocator.next_id("order").await.unwrap(), 1);
        assert_eq!(allocator.next_id("order").await.unwrap(), 2);
        assert_eq!(allocator.next_id("item").await.unwrap(), 1);
    }

    struct Unreachable;

    #[async_trait]
    impl PersistenceAdapter for Unreachable {
        fn backend_name(&self) -> &'static str {
            "unreachable"
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        async fn get_one(&self, _: &str, _: &Document) -> Result<Option<Document>, StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        async fn get_many(&self, _: &str, _: &Document) -> Result<Vec<Document>, StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        async fn create(&self, _: &str, _: Document) -> Result<Document, StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        async fn update_one(&self, _: &str, _: &Document, _: &Document) -> Result<u64, StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        async fn delete_one(&self, _: &str, _: &Document) -> Result<u64, StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        async fn increment_and_fetch(&self, _: &str) -> Result<i64, StoreError> {
            Err(StoreError::Backend("down".into()))
        }
        async fn current_counter(&self, _: &str) -> Result<Option<i64>, StoreError> {
            Err(StoreError::Backend("down".into()))
        }
    }

    #[tokio::test]
    async fn backend_failure_is_an_allocation_error() {
        let allocator = IdAllocator::new(Arc::new(Unreachable));
        assert!(matches!(allocator.next_id("order").await, Err(AppError::Allocation(_))));
    }
}
