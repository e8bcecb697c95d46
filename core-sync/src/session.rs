//! Per-run remote session
//!
//! A [`SyncSession`] is opened at the start of every add, verify or clean
//! run and dropped at its end. It holds the resolved library, the gateway
//! every remote call goes through, and the run's directory cache.

use bridge_traits::http::ByteRange;
use bridge_traits::storage::{RemoteEntry, RemoteLibrary, RemoteLibraryApi};
use bytes::Bytes;
use provider_seafile::{RateLimitedGateway, Result as RemoteResult};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::directory_cache::DirectoryCache;
use crate::error::{Result, SyncError};

/// Remote operations against one resolved library, each routed through the
/// rate-limited gateway.
#[derive(Clone)]
pub struct LibraryClient {
    api: Arc<dyn RemoteLibraryApi>,
    gateway: RateLimitedGateway,
    library: RemoteLibrary,
}

impl LibraryClient {
    pub fn new(
        api: Arc<dyn RemoteLibraryApi>,
        gateway: RateLimitedGateway,
        library: RemoteLibrary,
    ) -> Self {
        Self {
            api,
            gateway,
            library,
        }
    }

    pub fn library(&self) -> &RemoteLibrary {
        &self.library
    }

    pub fn gateway(&self) -> &RateLimitedGateway {
        &self.gateway
    }

    pub async fn list_directory(&self, path: &str) -> RemoteResult<Vec<RemoteEntry>> {
        self.gateway
            .call("list_directory", || {
                self.api.list_directory(&self.library, path)
            })
            .await
    }

    pub async fn download_url(&self, path: &str, file_name: &str) -> RemoteResult<String> {
        self.gateway
            .call("get_download_url", || {
                self.api.get_download_url(&self.library, path, file_name)
            })
            .await
    }

    pub async fn fetch(&self, url: &str, range: Option<ByteRange>) -> RemoteResult<Bytes> {
        self.gateway
            .call("fetch", || self.api.fetch(url, range))
            .await
    }
}

/// State of one sync invocation.
pub struct SyncSession {
    client: LibraryClient,
    cache: DirectoryCache,
}

impl SyncSession {
    /// Resolve `library_name` among the libraries visible to the current
    /// credentials.
    ///
    /// # Errors
    ///
    /// Returns `LibraryNotFound` when no library carries that exact name.
    pub async fn open(
        api: Arc<dyn RemoteLibraryApi>,
        gateway: RateLimitedGateway,
        library_name: &str,
    ) -> Result<Self> {
        let libraries = gateway
            .call("list_libraries", || api.list_libraries())
            .await?;

        debug!(count = libraries.len(), "Listed remote libraries");

        let library = libraries
            .into_iter()
            .find(|library| library.name == library_name)
            .ok_or_else(|| {
                warn!(library = library_name, "Configured library not found");
                SyncError::LibraryNotFound {
                    name: library_name.to_string(),
                }
            })?;

        info!(library = %library.name, library_id = %library.id, "Opened sync session");

        Ok(Self {
            client: LibraryClient::new(api, gateway, library),
            cache: DirectoryCache::new(),
        })
    }

    pub fn client(&self) -> &LibraryClient {
        &self.client
    }

    pub fn library(&self) -> &RemoteLibrary {
        self.client.library()
    }

    pub fn cache(&self) -> &DirectoryCache {
        &self.cache
    }

    /// Look up `file_name` in the remote directory `path`, listing the
    /// directory at most once per session.
    ///
    /// `Ok(None)` means the remote confirmed the file is absent.
    pub async fn locate(&mut self, path: &str, file_name: &str) -> Result<Option<RemoteEntry>> {
        self.cache.find_entry(&self.client, path, file_name).await
    }
}
