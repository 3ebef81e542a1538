//! Scope filter attached to a request by upstream middleware (e.g. tenant or owner constraints).

use crate::store::Document;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Extra query constraints every CRUD operation of the request must honour.
///
/// Middleware inserts it as a request extension; a request without one gets an empty filter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScopeFilter(pub Document);

#[async_trait]
impl<S> FromRequestParts<S> for ScopeFilter
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<ScopeFilter>().cloned().unwrap_or_default())
    }
}
