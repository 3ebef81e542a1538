//! Safe SQL building for the PostgreSQL document store.

mod builder;
pub use builder::*;
