//! # Catalog Record Store
//!
//! Owns the local catalog records that a sync run creates, refreshes and
//! prunes.
//!
//! ## Overview
//!
//! - [`CatalogStore`]: the record store contract used by the sync engine
//! - [`SqliteCatalogStore`]: sqlx-backed store on a SQLite pool
//! - [`InMemoryCatalogStore`]: process-local store for tests and embedding
//!
//! A record's `file` field holds the virtual path of its remote source and is
//! unique within a catalog.

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{LibraryError, Result};
pub use models::{CatalogId, CatalogRecord, ExtractedMetadata, RecordId, RecordSummary, TagFields};
pub use repositories::{CatalogStore, InMemoryCatalogStore, SqliteCatalogStore};
