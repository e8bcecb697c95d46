//! # Remote Catalog Sync
//!
//! Reconciles a local catalog with a remote Seafile library.
//!
//! ## Components
//!
//! - **Virtual paths** (`virtual_path`): encode a remote location into a
//!   record's `file` field and back
//! - **Session** (`session`): resolved library plus gateway-routed remote
//!   calls for one run
//! - **Directory cache** (`directory_cache`): one listing per directory per
//!   run for existence checks
//! - **Crawler** (`crawler`): lazy depth-first walk of the remote tree
//! - **Metadata processor** (`metadata_processor`): bounded-prefix download
//!   and tag reading
//! - **Engine** (`engine`): the add, verify and clean procedures and media
//!   materialization for playback

pub mod crawler;
pub mod directory_cache;
pub mod engine;
pub mod error;
pub mod metadata_processor;
pub mod report;
pub mod session;
pub mod virtual_path;

#[cfg(test)]
pub(crate) mod test_support;

pub use crawler::{crawl, CrawledFile};
pub use directory_cache::DirectoryCache;
pub use engine::{MaterializedMedia, SyncEngine};
pub use error::{Result, SyncError};
pub use metadata_processor::MetadataProcessor;
pub use report::{RunReport, NO_MEDIA_WARNING};
pub use session::{LibraryClient, SyncSession};
pub use virtual_path::{RemoteLocation, VirtualPath};
