//! Workspace facade crate.
//!
//! Re-exports the individual workspace crates so a host application can depend
//! on `seafile-catalog` alone and reach the catalog backend, the sync engine,
//! the record store contract and the runtime helpers from one place.

pub use bridge_traits;
pub use core_library;
pub use core_metadata;
pub use core_runtime;
pub use core_service;
pub use core_sync;
pub use provider_seafile;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop;

pub use core_service::{BackendRegistry, CatalogBackend, SeafileCatalog};
pub use core_sync::{SyncEngine, SyncSession};
