//! HTTP handlers for generated resources and object storage.

pub mod objects;
pub mod resource;
