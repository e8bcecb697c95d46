//! Seafile catalog backend
//!
//! Binds one [`CatalogConfig`] to the sync engine. The API token lives in the
//! host's [`SecureStore`] under a per-catalog key and is mirrored into the
//! live configuration; each run builds a fresh connector from the current
//! configuration.

use async_trait::async_trait;
use bridge_traits::http::HttpClient;
use bridge_traits::storage::{RemoteLibraryApi, SecureStore};
use core_library::CatalogStore;
use core_metadata::{LoftyTagReader, TagReader};
use core_runtime::config::CatalogConfig;
use core_runtime::events::EventBus;
use core_sync::{
    MaterializedMedia, RemoteLocation, RunReport, SyncEngine, SyncError, VirtualPath,
};
use provider_seafile::{RateLimitedGateway, SeafileConnector};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::backend::{CatalogBackend, ConfigField, FieldKind};
use crate::error::{Result, ServiceError};

pub const CATALOG_TYPE: &str = "seafile";
pub const DESCRIPTION: &str = "Seafile Remote Catalog";
pub const VERSION: &str = "000001";
pub const DEFAULT_SERVER_URI: &str = "https://seafile.example.org/";

const CREATE_HELP: &str = "Enter the address of your Seafile server and the name of the \
library holding your media. After creating the catalog, sign in once with your Seafile \
username and password to obtain an API token; the password itself is not stored.";

/// Secure-store key holding the API token of catalog `catalog_id`.
pub fn token_key(catalog_id: i64) -> String {
    format!("seafile.catalog.{}.api_token", catalog_id)
}

/// A catalog backed by one Seafile library.
pub struct SeafileCatalog {
    config: RwLock<CatalogConfig>,
    http_client: Arc<dyn HttpClient>,
    secure_store: Arc<dyn SecureStore>,
    store: Arc<dyn CatalogStore>,
    tag_reader: Arc<dyn TagReader>,
    events: EventBus,
    cancel: CancellationToken,
}

impl SeafileCatalog {
    pub fn new(
        config: CatalogConfig,
        http_client: Arc<dyn HttpClient>,
        secure_store: Arc<dyn SecureStore>,
        store: Arc<dyn CatalogStore>,
    ) -> Self {
        Self {
            config: RwLock::new(config),
            http_client,
            secure_store,
            store,
            tag_reader: Arc::new(LoftyTagReader::new()),
            events: EventBus::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_tag_reader(mut self, tag_reader: Arc<dyn TagReader>) -> Self {
        self.tag_reader = tag_reader;
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Snapshot of the live configuration.
    pub async fn config(&self) -> CatalogConfig {
        self.config.read().await.clone()
    }

    /// The token from the configuration, or failing that the secure store.
    async fn current_token(&self) -> Option<String> {
        let catalog_id = {
            let config = self.config.read().await;
            if config.is_ready() {
                return config.api_token.clone();
            }
            config.catalog_id
        };

        match self.secure_store.get_secret(&token_key(catalog_id)).await {
            Ok(Some(bytes)) => {
                let token = String::from_utf8_lossy(&bytes).into_owned();
                if token.is_empty() {
                    return None;
                }
                self.config.write().await.api_token = Some(token.clone());
                Some(token)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(catalog_id, error = %e, "Failed to read stored API token");
                None
            }
        }
    }

    fn connector(&self, config: &CatalogConfig) -> SeafileConnector {
        SeafileConnector::new(self.http_client.clone(), &config.server_uri)
            .with_timeout(config.request_timeout)
    }

    async fn engine(&self) -> Result<SyncEngine> {
        let token = self.current_token().await.ok_or_else(|| {
            ServiceError::NotReady("no API token; sign in to the Seafile server first".to_string())
        })?;
        let config = self.config().await;

        let api: Arc<dyn RemoteLibraryApi> = Arc::new(self.connector(&config).with_token(token));
        Ok(
            SyncEngine::new(config, api, self.store.clone(), self.tag_reader.clone())
                .with_event_bus(self.events.clone())
                .with_cancellation(self.cancel.clone()),
        )
    }
}

#[async_trait]
impl CatalogBackend for SeafileCatalog {
    fn catalog_type(&self) -> &'static str {
        CATALOG_TYPE
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    fn version(&self) -> &'static str {
        VERSION
    }

    fn create_help(&self) -> &'static str {
        CREATE_HELP
    }

    fn config_fields(&self) -> Vec<ConfigField> {
        vec![
            ConfigField {
                name: "server_uri",
                description: "Server URI",
                kind: FieldKind::Url,
                default: Some(DEFAULT_SERVER_URI),
            },
            ConfigField {
                name: "library_name",
                description: "Library Name",
                kind: FieldKind::Text,
                default: None,
            },
        ]
    }

    async fn is_ready(&self) -> bool {
        self.current_token().await.is_some()
    }

    #[instrument(skip(self, password))]
    async fn perform_ready(&self, username: &str, password: &str) -> Result<()> {
        let config = self.config().await;
        config.validate()?;

        let connector = self.connector(&config);
        let gateway =
            RateLimitedGateway::new(config.rate_limit).with_cancellation(self.cancel.clone());
        let token = gateway
            .call("authenticate", || connector.authenticate(username, password))
            .await
            .map_err(|e| {
                if e.is_unauthorized() {
                    ServiceError::AuthenticationFailed(e.to_string())
                } else {
                    ServiceError::Sync(SyncError::from(e))
                }
            })?;

        self.secure_store
            .set_secret(&token_key(config.catalog_id), token.as_bytes())
            .await?;
        self.config.write().await.api_token = Some(token);

        info!(catalog_id = config.catalog_id, "Stored Seafile API token");
        Ok(())
    }

    async fn add(&self) -> Result<RunReport> {
        Ok(self.engine().await?.add().await?)
    }

    async fn verify(&self) -> Result<RunReport> {
        Ok(self.engine().await?.verify().await?)
    }

    async fn clean(&self) -> Result<RunReport> {
        Ok(self.engine().await?.clean().await?)
    }

    fn get_rel_path(&self, file: &str) -> Result<RemoteLocation> {
        Ok(VirtualPath::parse(file)?.into_location())
    }

    async fn prepare_media(&self, file: &str) -> Result<MaterializedMedia> {
        Ok(self.engine().await?.prepare_media(file).await?)
    }

    async fn format_info(&self) -> String {
        let config = self.config.read().await;
        format!(
            "Seafile server \"{}\", library \"{}\"",
            config.server_uri, config.library_name
        )
    }
}
