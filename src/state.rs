//! Shared state: one `ResourceState` per generated resource, one `AppState` for the common routes.

use crate::allocator::IdAllocator;
use crate::model::{DerivedModel, ResourceModels};
use crate::store::PersistenceAdapter;
use std::sync::Arc;

/// Everything the five handlers of one resource close over.
pub struct ResourceState {
    /// Lower-snake-case resource (collection) name.
    pub resource: String,
    pub models: ResourceModels,
    /// Base-model shape a created record is rebuilt against. `id` is optional here when the
    /// server assigns it.
    pub record_model: DerivedModel,
    pub store: Arc<dyn PersistenceAdapter>,
    /// Present only when ids must be allocated by the engine.
    pub allocator: Option<IdAllocator>,
}

impl ResourceState {
    pub fn new(
        resource: String,
        models: ResourceModels,
        store: Arc<dyn PersistenceAdapter>,
        allocate_ids: bool,
    ) -> Self {
        let has_id = models.base.has_field("id");
        let allocator = (allocate_ids && has_id && !store.supports_auto_increment_id())
            .then(|| IdAllocator::new(store.clone()));
        let server_assigns_id = has_id && (allocator.is_some() || store.supports_auto_increment_id());

        let mut record_model = DerivedModel::whole(models.base.name.clone(), &models.base);
        if server_assigns_id {
            if let Some(id) = record_model.fields.iter_mut().find(|f| f.name == "id") {
                id.is_required = false;
            }
        }
        ResourceState {
            resource,
            models,
            record_model,
            store,
            allocator,
        }
    }
}

/// State for the health and readiness routes.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PersistenceAdapter>,
}
