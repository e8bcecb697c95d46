//! Catalog backend contract and registry
//!
//! A host manages catalogs of several kinds through one interface. Each kind
//! implements [`CatalogBackend`] and is registered in a [`BackendRegistry`]
//! under its catalog type, together with a factory that builds an instance
//! from a [`CatalogConfig`].

use async_trait::async_trait;
use core_runtime::config::CatalogConfig;
use core_sync::{MaterializedMedia, RemoteLocation, RunReport};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, ServiceError};

/// Input widget a host should render for a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Url,
    Text,
    Password,
}

/// One configuration value a catalog needs at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigField {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: FieldKind,
    pub default: Option<&'static str>,
}

/// Operations every catalog kind offers to the host.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// Registry key, e.g. `"seafile"`.
    fn catalog_type(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn version(&self) -> &'static str;

    /// Help text shown when creating a catalog of this kind.
    fn create_help(&self) -> &'static str;

    fn config_fields(&self) -> Vec<ConfigField>;

    /// Whether the catalog holds the credentials it needs to run.
    async fn is_ready(&self) -> bool;

    /// Exchange user credentials for a stored API token.
    async fn perform_ready(&self, username: &str, password: &str) -> Result<()>;

    async fn add(&self) -> Result<RunReport>;

    async fn verify(&self) -> Result<RunReport>;

    async fn clean(&self) -> Result<RunReport>;

    /// Remote location behind a record's `file` field.
    fn get_rel_path(&self, file: &str) -> Result<RemoteLocation>;

    /// Download a record's remote file for playback.
    async fn prepare_media(&self, file: &str) -> Result<MaterializedMedia>;

    /// One-line description of the catalog's remote source.
    async fn format_info(&self) -> String;
}

/// Builds a backend for one catalog configuration.
pub type BackendFactory =
    Arc<dyn Fn(CatalogConfig) -> Result<Arc<dyn CatalogBackend>> + Send + Sync>;

/// Catalog kinds known to the host, keyed by catalog type.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: BTreeMap<String, BackendFactory>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `catalog_type`, replacing any previous one.
    pub fn register<F>(&mut self, catalog_type: impl Into<String>, factory: F)
    where
        F: Fn(CatalogConfig) -> Result<Arc<dyn CatalogBackend>> + Send + Sync + 'static,
    {
        self.factories.insert(catalog_type.into(), Arc::new(factory));
    }

    pub fn contains(&self, catalog_type: &str) -> bool {
        self.factories.contains_key(catalog_type)
    }

    /// Registered catalog types in sorted order.
    pub fn catalog_types(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build a backend of `catalog_type` for `config`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCatalogType` if nothing is registered under the type,
    /// or whatever the factory reports.
    pub fn create(&self, catalog_type: &str, config: CatalogConfig) -> Result<Arc<dyn CatalogBackend>> {
        let factory = self
            .factories
            .get(catalog_type)
            .ok_or_else(|| ServiceError::UnknownCatalogType(catalog_type.to_string()))?;
        factory(config)
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("catalog_types", &self.catalog_types())
            .finish()
    }
}
