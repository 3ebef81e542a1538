//! The five CRUD operations of a generated resource, independent of HTTP.

use crate::error::AppError;
use crate::service::validation::{PayloadValidator, ValidationMode};
use crate::state::ResourceState;
use crate::store::Document;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Per-request side-channel data: a filter from upstream middleware and the resolved path id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestContext {
    pub filter: Document,
    pub id: Option<i64>,
}

impl RequestContext {
    pub fn new(scope: Document) -> Self {
        RequestContext { filter: scope, id: None }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Merge a client-supplied filter underneath the scope filter; scope values win.
    pub fn with_client_filter(mut self, client: Document) -> Self {
        let mut merged = client;
        merged.extend(std::mem::take(&mut self.filter));
        self.filter = merged;
        self
    }

    /// The query sent to the adapter. The path id is merged last and always wins.
    pub fn query(&self) -> Document {
        let mut q = self.filter.clone();
        if let Some(id) = self.id {
            q.insert("id".into(), Value::Number(id.into()));
        }
        q
    }

    fn describe_target(&self, resource: &str) -> String {
        match self.id {
            Some(id) => format!("{} {}", resource, id),
            None => resource.to_string(),
        }
    }
}

pub struct CrudService;

impl CrudService {
    pub async fn read_one(res: &ResourceState, ctx: &RequestContext) -> Result<Document, AppError> {
        let row = res
            .store
            .get_one(&res.resource, &ctx.query())
            .await?
            .ok_or_else(|| AppError::NotFound(ctx.describe_target(&res.resource)))?;
        Ok(res.models.output.project(&row))
    }

    /// List records matching the validated query-string filter merged with the scope filter.
    pub async fn read_many(
        res: &ResourceState,
        ctx: RequestContext,
        params: &HashMap<String, String>,
    ) -> Result<Vec<Document>, AppError> {
        let filter = PayloadValidator::validate_query(&res.models.query, params)?;
        let ctx = ctx.with_client_filter(filter);
        let rows = res.store.get_many(&res.resource, &ctx.query()).await?;
        Ok(rows.iter().map(|r| res.models.output.project(r)).collect())
    }

    /// Validate against the input model, rebuild against the base model, allocate an id when the
    /// engine owns id assignment and the client sent none, then store.
    pub async fn create(res: &ResourceState, body: &Map<String, Value>) -> Result<Document, AppError> {
        let input = PayloadValidator::validate(&res.models.input, body, ValidationMode::Full)?;
        let mut record = PayloadValidator::validate(&res.record_model, &input, ValidationMode::Full)?;
        if let Some(allocator) = &res.allocator {
            if record.get("id").map_or(true, Value::is_null) {
                let id = allocator.next_id(&res.resource).await?;
                record.insert("id".into(), Value::Number(id.into()));
            }
        }
        let stored = res.store.create(&res.resource, record).await?;
        tracing::debug!(resource = %res.resource, id = ?stored.get("id"), "created");
        Ok(res.models.output.project(&stored))
    }

    /// Apply only the supplied update fields to the target record.
    pub async fn update(
        res: &ResourceState,
        ctx: &RequestContext,
        body: &Map<String, Value>,
    ) -> Result<(), AppError> {
        let partial = PayloadValidator::validate(&res.models.update, body, ValidationMode::Partial)?;
        let matched = res.store.update_one(&res.resource, &ctx.query(), &partial).await?;
        if matched == 0 {
            return Err(AppError::NotFound(ctx.describe_target(&res.resource)));
        }
        Ok(())
    }

    pub async fn delete(res: &ResourceState, ctx: &RequestContext) -> Result<(), AppError> {
        let deleted = res.store.delete_one(&res.resource, &ctx.query()).await?;
        if deleted == 0 {
            return Err(AppError::NotFound(ctx.describe_target(&res.resource)));
        }
        Ok(())
    }
}
