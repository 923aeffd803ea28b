pub mod manager;
pub mod models;
pub mod query_builder;
pub mod scope;

pub use manager::{DatabaseError, DatabaseManager};
pub use scope::ScopeFilter;
