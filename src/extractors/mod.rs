//! Request extractors.

pub mod scope;
pub use scope::ScopeFilter;
