//! Object storage routes.

use crate::handlers::objects::{download, upload, url, StorageState};
use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;

/// Routes claimed by [`object_routes`], for reserving them before generation.
pub fn object_route_keys() -> Vec<(Method, String)> {
    vec![
        (Method::POST, "/objects".to_string()),
        (Method::GET, "/objects/{name}".to_string()),
        (Method::GET, "/objects/{name}/url".to_string()),
    ]
}

/// POST /objects, GET /objects/:name, GET /objects/:name/url
pub fn object_routes(storage: StorageState, body_limit: usize) -> Router {
    Router::new()
        .route("/objects", post(upload))
        .route("/objects/:name", get(download))
        .route("/objects/:name/url", get(url))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(storage)
}
