//! Schema CRUD: declare models with tagged fields, get validated REST CRUD routes over a pluggable store.

pub mod allocator;
pub mod case;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod model;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod storage;
pub mod store;
mod value;

pub use allocator::IdAllocator;
pub use error::{AppError, GenerationError, SettingsError, StorageError, StoreError};
pub use extractors::ScopeFilter;
pub use model::{load_models_from_dir, tags, FieldConfig, FieldType, ModelConfig};
pub use routes::{
    build_openapi, common_routes, object_routes, openapi_routes, reserved_route_keys, ApiGenerator, GeneratedApi,
};
pub use service::{CrudService, RequestContext};
pub use settings::Settings;
pub use state::{AppState, ResourceState};
pub use storage::{MemoryObjectStorage, ObjectStorage, S3ObjectStorage};
pub use store::{ensure_database_exists, MemoryStore, PersistenceAdapter, PgDocumentStore};
