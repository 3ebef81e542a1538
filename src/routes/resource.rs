//! Route generation: five CRUD endpoints per declared model, each closing over its resource state.

use crate::case::resource_name;
use crate::error::GenerationError;
use crate::handlers::resource as handlers;
use crate::model::{DerivedModel, ModelConfig, ModelRegistry, ResourceModels, VariantCache};
use crate::settings::{normalize_prefix, Settings, DEFAULT_BODY_LIMIT};
use crate::state::ResourceState;
use crate::store::PersistenceAdapter;
use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{delete, get, post, put, MethodRouter},
    Router,
};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    ReadOne,
    ReadMany,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::ReadOne,
        Operation::ReadMany,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn method(&self) -> Method {
        match self {
            Operation::ReadOne | Operation::ReadMany => Method::GET,
            Operation::Create => Method::POST,
            Operation::Update => Method::PUT,
            Operation::Delete => Method::DELETE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ReadOne => "read_one",
            Operation::ReadMany => "read_many",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Path under the API prefix, with `{id}` as the path parameter.
    pub fn path(&self, prefix: &str, resource: &str) -> String {
        match self {
            Operation::ReadOne | Operation::Update | Operation::Delete => format!("{}/{}/{{id}}", prefix, resource),
            Operation::ReadMany => format!("{}/{}s", prefix, resource),
            Operation::Create => format!("{}/{}", prefix, resource),
        }
    }

    fn method_router(&self, state: Arc<ResourceState>) -> MethodRouter {
        match self {
            Operation::ReadOne => get(handlers::read_one).with_state(state),
            Operation::ReadMany => get(handlers::read_many).with_state(state),
            Operation::Create => post(handlers::create).with_state(state),
            Operation::Update => put(handlers::update).with_state(state),
            Operation::Delete => delete(handlers::delete).with_state(state),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One registered route and the models shaping it.
#[derive(Clone, Debug)]
pub struct Endpoint {
    pub method: Method,
    pub path: String,
    pub operation: Operation,
    pub resource: String,
    pub request_model: Option<Arc<DerivedModel>>,
    pub response_model: Option<Arc<DerivedModel>>,
    /// Query-string filter model (read-many only).
    pub query_model: Option<Arc<DerivedModel>>,
}

impl Endpoint {
    fn new(operation: Operation, prefix: &str, resource: &str, models: &ResourceModels) -> Self {
        let (request_model, response_model, query_model) = match operation {
            Operation::ReadOne => (None, Some(models.output.clone()), None),
            Operation::ReadMany => (None, Some(models.output.clone()), Some(models.query.clone())),
            Operation::Create => (Some(models.input.clone()), Some(models.output.clone()), None),
            Operation::Update => (Some(models.update.clone()), None, None),
            Operation::Delete => (None, None, None),
        };
        Endpoint {
            method: operation.method(),
            path: operation.path(prefix, resource),
            operation,
            resource: resource.to_string(),
            request_model,
            response_model,
            query_model,
        }
    }

    /// `/order/{id}` -> `/order/:id`
    pub fn axum_path(&self) -> String {
        self.path.replace("{id}", ":id")
    }
}

/// Turns model declarations into resources and routes.
pub struct ApiGenerator {
    store: Arc<dyn PersistenceAdapter>,
    prefix: String,
    allocate_ids: bool,
    body_limit: usize,
    reserved: Vec<(Method, String)>,
}

impl ApiGenerator {
    pub fn new(store: Arc<dyn PersistenceAdapter>) -> Self {
        ApiGenerator {
            store,
            prefix: String::new(),
            allocate_ids: true,
            body_limit: DEFAULT_BODY_LIMIT,
            reserved: Vec::new(),
        }
    }

    pub fn from_settings(store: Arc<dyn PersistenceAdapter>, settings: &Settings) -> Self {
        Self::new(store)
            .with_prefix(&settings.api_prefix)
            .with_id_allocation(settings.id_auto_incr)
            .with_body_limit(settings.body_limit)
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = normalize_prefix(prefix);
        self
    }

    pub fn with_id_allocation(mut self, enabled: bool) -> Self {
        self.allocate_ids = enabled;
        self
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Routes owned by something else (health, objects, ...) that generated routes must not shadow.
    pub fn reserve(mut self, method: Method, path: impl Into<String>) -> Self {
        self.reserved.push((method, path.into()));
        self
    }

    pub fn reserve_all(mut self, routes: impl IntoIterator<Item = (Method, String)>) -> Self {
        self.reserved.extend(routes);
        self
    }

    /// Generate every model. A model that fails is skipped and recorded; the rest still register.
    pub fn generate(&self, models: impl IntoIterator<Item = ModelConfig>) -> GeneratedApi {
        let mut api = GeneratedApi {
            resources: Vec::new(),
            endpoints: Vec::new(),
            failures: Vec::new(),
            body_limit: self.body_limit,
        };
        let mut registry = ModelRegistry::new();
        let cache = VariantCache::new();
        let mut resources: HashSet<String> = HashSet::new();
        let mut routes: HashSet<(Method, String)> = self.reserved.iter().map(|(m, p)| route_key(m, p)).collect();

        for config in models {
            match self.generate_one(&config, &mut registry, &cache, &mut resources, &mut routes) {
                Ok((state, endpoints)) => {
                    for e in &endpoints {
                        tracing::info!(method = %e.method, path = %e.path, operation = %e.operation, "route registered");
                    }
                    tracing::info!(model = %config.name, resource = %state.resource, "resource generated");
                    api.resources.push(state);
                    api.endpoints.extend(endpoints);
                }
                Err(e) => {
                    tracing::warn!(model = %config.name, error = %e, "resource skipped");
                    api.failures.push(e);
                }
            }
        }
        api
    }

    fn generate_one(
        &self,
        config: &ModelConfig,
        registry: &mut ModelRegistry,
        cache: &VariantCache,
        resources: &mut HashSet<String>,
        routes: &mut HashSet<(Method, String)>,
    ) -> Result<(Arc<ResourceState>, Vec<Endpoint>), GenerationError> {
        let resource = resource_name(&config.name);
        if resource.is_empty() {
            return Err(GenerationError::invalid(&config.name, "model name yields an empty resource name"));
        }
        if resources.contains(&resource) {
            return Err(GenerationError::DuplicateResource(resource));
        }
        let base = registry.register(config)?;
        let models = ResourceModels::build(base, cache)?;

        let endpoints: Vec<Endpoint> = Operation::ALL
            .iter()
            .map(|op| Endpoint::new(*op, &self.prefix, &resource, &models))
            .collect();
        if let Some(clash) = endpoints
            .iter()
            .find(|e| routes.contains(&route_key(&e.method, &e.path)))
        {
            return Err(GenerationError::DuplicateRoute {
                method: clash.method.to_string(),
                path: clash.path.clone(),
            });
        }

        routes.extend(endpoints.iter().map(|e| route_key(&e.method, &e.path)));
        resources.insert(resource.clone());
        let state = Arc::new(ResourceState::new(resource, models, self.store.clone(), self.allocate_ids));
        Ok((state, endpoints))
    }
}

/// Parameter names are erased: `/objects/{id}` and `/objects/{name}` match the same requests.
fn route_key(method: &Method, path: &str) -> (Method, String) {
    let mut key = String::with_capacity(path.len());
    let mut in_param = false;
    for c in path.chars() {
        match c {
            '{' => {
                in_param = true;
                key.push(c);
            }
            '}' => {
                in_param = false;
                key.push(c);
            }
            _ if in_param => {}
            _ => key.push(c),
        }
    }
    (method.clone(), key)
}

/// Result of a generation run.
pub struct GeneratedApi {
    pub resources: Vec<Arc<ResourceState>>,
    pub endpoints: Vec<Endpoint>,
    pub failures: Vec<GenerationError>,
    body_limit: usize,
}

impl GeneratedApi {
    pub fn resource(&self, name: &str) -> Option<&Arc<ResourceState>> {
        self.resources.iter().find(|r| r.resource == name)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Axum router for every generated endpoint, with the request body limit applied.
    pub fn router(&self) -> Router {
        let mut router = Router::new();
        for e in &self.endpoints {
            let Some(state) = self.resource(&e.resource) else { continue };
            router = router.route(&e.axum_path(), e.operation.method_router(state.clone()));
        }
        router
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(self.body_limit))
    }

    /// Let the store create whatever each collection needs (tables, indexes).
    pub async fn prepare_collections(&self) -> Result<(), crate::error::StoreError> {
        for r in &self.resources {
            r.store.ensure_collection(&r.resource).await?;
            tracing::debug!(resource = %r.resource, backend = r.store.backend_name(), "collection ready");
        }
        Ok(())
    }
}
