//! Storage Abstractions
//!
//! Provides platform-agnostic traits for secure credential storage and for the
//! remote, library-oriented file storage the catalog is synchronised against.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::http::ByteRange;

/// One named storage container visible to the current credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLibrary {
    pub name: String,
    /// Opaque remote identifier used in API paths.
    pub id: String,
}

/// Kind of an item in a remote directory listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

/// One item of a remote directory listing. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
    /// Size in bytes; zero for directories.
    pub size: u64,
}

impl RemoteEntry {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            size: 0,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Remote library access trait
///
/// The raw operations a remote, library-based file store exposes. Every method
/// performs exactly one remote call; implementations report throttling as
/// [`BridgeError::RateLimited`](crate::error::BridgeError::RateLimited) and
/// leave the backoff to the caller.
///
/// Directory paths are absolute and slash-terminated (`/`, `/A/`, `/A/B/`).
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::RemoteLibraryApi;
///
/// async fn root_names(api: &dyn RemoteLibraryApi, name: &str) -> Result<Vec<String>> {
///     let libraries = api.list_libraries().await?;
///     let library = libraries.into_iter().find(|l| l.name == name).unwrap();
///     let entries = api.list_directory(&library, "/").await?;
///     Ok(entries.into_iter().map(|e| e.name).collect())
/// }
/// ```
#[async_trait]
pub trait RemoteLibraryApi: Send + Sync {
    /// Exchange a username/password pair for a long-lived API token.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the credentials are rejected.
    async fn authenticate(&self, username: &str, password: &str) -> Result<String>;

    /// List every library visible to the current token.
    async fn list_libraries(&self) -> Result<Vec<RemoteLibrary>>;

    /// List a directory, in the order the remote returns it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the directory does not exist.
    async fn list_directory(&self, library: &RemoteLibrary, path: &str) -> Result<Vec<RemoteEntry>>;

    /// Obtain a short-lived download URL for `path` + `file_name`.
    async fn get_download_url(
        &self,
        library: &RemoteLibrary,
        path: &str,
        file_name: &str,
    ) -> Result<String>;

    /// Fetch the resource behind `url`, limited to `range` when given.
    async fn fetch(&self, url: &str, range: Option<ByteRange>) -> Result<Bytes>;
}

/// Secure credential storage trait
///
/// Abstracts secure storage mechanisms:
/// - macOS/iOS: Keychain
/// - Windows: DPAPI
/// - Linux: Secret Service / libsecret
///
/// # Security Requirements
///
/// Implementations MUST:
/// - Encrypt data at rest where the platform allows it
/// - Never log or expose sensitive data
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SecureStore;
///
/// async fn store_token(store: &dyn SecureStore, token: &str) -> Result<()> {
///     store.set_secret("seafile.api_token.1", token.as_bytes()).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret value, replacing any previous one under `key`.
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret value
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret
    async fn delete_secret(&self, key: &str) -> Result<()>;

    /// Check if a secret exists without retrieving it
    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }
}
