//! Request-time services: payload validation and the CRUD operations.

mod crud;
pub mod validation;
pub use crud::{CrudService, RequestContext};
pub use validation::{PayloadValidator, ValidationMode};
