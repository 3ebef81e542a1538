//! Routers: generated resources, common endpoints, objects, API description.

pub mod common;
pub mod objects;
pub mod openapi;
pub mod resource;

pub use common::common_routes;
pub use objects::{object_route_keys, object_routes};
pub use openapi::{build_openapi, openapi_routes};
pub use resource::{ApiGenerator, Endpoint, GeneratedApi, Operation};

use axum::http::Method;

/// Routes served next to the generated ones, reserved so no model can shadow them.
pub fn reserved_route_keys(with_objects: bool) -> Vec<(Method, String)> {
    let mut keys: Vec<(Method, String)> = ["/health", "/ready", "/version", "/openapi.json"]
        .iter()
        .map(|p| (Method::GET, p.to_string()))
        .collect();
    if with_objects {
        keys.extend(object_route_keys());
    }
    keys
}
