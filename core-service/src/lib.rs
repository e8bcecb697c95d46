//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, secure
//! storage) and a catalog record store into the catalog backends. Desktop
//! apps typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) and call [`bootstrap_desktop`].

pub mod backend;
pub mod error;
pub mod seafile;

pub use backend::{BackendFactory, BackendRegistry, CatalogBackend, ConfigField, FieldKind};
pub use error::{Result, ServiceError};
pub use seafile::SeafileCatalog;

use std::sync::Arc;

use bridge_traits::{http::HttpClient, storage::SecureStore};
use core_library::CatalogStore;
use core_runtime::events::EventBus;

#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
use bridge_desktop::{InMemorySecureStore, ReqwestHttpClient};

/// Aggregated handle to all dependencies the catalog backends require.
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub secure_store: Arc<dyn SecureStore>,
    pub catalog_store: Arc<dyn CatalogStore>,
    pub events: EventBus,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit handles.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        secure_store: Arc<dyn SecureStore>,
        catalog_store: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            http_client,
            secure_store,
            catalog_store,
            events: EventBus::default(),
        }
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    deps: Arc<CoreDependencies>,
    registry: BackendRegistry,
}

impl CoreService {
    /// Create a service with every built-in catalog type registered.
    pub fn new(deps: CoreDependencies) -> Self {
        let deps = Arc::new(deps);
        let mut registry = BackendRegistry::new();

        let seafile_deps = Arc::clone(&deps);
        registry.register(seafile::CATALOG_TYPE, move |config| {
            config.validate()?;
            let catalog = SeafileCatalog::new(
                config,
                seafile_deps.http_client.clone(),
                seafile_deps.secure_store.clone(),
                seafile_deps.catalog_store.clone(),
            )
            .with_event_bus(seafile_deps.events.clone());
            Ok(Arc::new(catalog) as Arc<dyn CatalogBackend>)
        });

        Self { deps, registry }
    }

    /// Access the dependencies being used by the service.
    pub fn dependencies(&self) -> Arc<CoreDependencies> {
        Arc::clone(&self.deps)
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Build the backend for a catalog of `catalog_type`.
    pub fn open_catalog(
        &self,
        catalog_type: &str,
        config: core_runtime::CatalogConfig,
    ) -> Result<Arc<dyn CatalogBackend>> {
        self.registry.create(catalog_type, config)
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// Uses the reqwest HTTP client and a process-local secure store.
///
/// ```ignore
/// use core_library::{create_pool, DatabaseConfig, SqliteCatalogStore};
/// use core_service::bootstrap_desktop;
/// use std::sync::Arc;
///
/// let pool = create_pool(DatabaseConfig::new("catalog.db")).await?;
/// let core = bootstrap_desktop(Arc::new(SqliteCatalogStore::new(pool)))?;
/// let catalog = core.open_catalog("seafile", config)?;
/// ```
#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub fn bootstrap_desktop(catalog_store: Arc<dyn CatalogStore>) -> Result<CoreService> {
    let http_client = ReqwestHttpClient::new()
        .map_err(|err| ServiceError::InitializationFailed(err.to_string()))?;
    Ok(CoreService::new(CoreDependencies::new(
        Arc::new(http_client),
        Arc::new(InMemorySecureStore::new()),
        catalog_store,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_desktop::InMemorySecureStore;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpRequest, HttpResponse};
    use core_library::InMemoryCatalogStore;
    use core_runtime::CatalogConfig;

    struct OfflineHttp;

    #[async_trait]
    impl HttpClient for OfflineHttp {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(BridgeError::NotAvailable("offline".to_string()))
        }
    }

    fn service() -> CoreService {
        CoreService::new(CoreDependencies::new(
            Arc::new(OfflineHttp),
            Arc::new(InMemorySecureStore::new()),
            Arc::new(InMemoryCatalogStore::new()),
        ))
    }

    fn config() -> CatalogConfig {
        CatalogConfig::builder()
            .catalog_id(1)
            .server_uri("https://seafile.example.org/")
            .library_name("Music")
            .build()
            .unwrap()
    }

    #[test]
    fn test_registry_knows_seafile() {
        let core = service();
        assert_eq!(core.registry().catalog_types(), vec!["seafile"]);
        assert!(core.registry().contains("seafile"));
    }

    #[tokio::test]
    async fn test_open_catalog() {
        let catalog = service().open_catalog("seafile", config()).unwrap();

        assert_eq!(catalog.catalog_type(), "seafile");
        assert!(!catalog.is_ready().await);
    }

    #[test]
    fn test_unknown_catalog_type() {
        let err = service().open_catalog("local", config()).err().unwrap();
        assert!(matches!(err, ServiceError::UnknownCatalogType(t) if t == "local"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = config();
        config.server_uri = "ftp://seafile.example.org".to_string();

        let err = service().open_catalog("seafile", config).err().unwrap();
        assert!(matches!(err, ServiceError::Config(_)));
    }
}
