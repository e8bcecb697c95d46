//! # Catalog Store Implementations
//!
//! - `CatalogStore`: the contract the sync engine writes through
//! - `SqliteCatalogStore`: sqlx on a SQLite pool
//! - `InMemoryCatalogStore`: tokio `RwLock` over a map
//!
//! Insert and delete are single statements, so an interrupted run never
//! leaves a half-written record behind.

pub mod catalog;
pub mod memory;

pub use catalog::{CatalogStore, SqliteCatalogStore};
pub use memory::InMemoryCatalogStore;
