//! Session-scoped memo of remote directory listings

use bridge_traits::storage::RemoteEntry;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::session::LibraryClient;

#[derive(Debug, Clone)]
enum Listing {
    Present(Vec<RemoteEntry>),
    /// The remote answered not-found for this directory.
    Absent,
}

/// Directory listings keyed by remote path.
///
/// Only confirmed answers are cached. A listing that fails for any reason
/// other than not-found is returned as an error and retried on the next
/// lookup.
#[derive(Debug, Default)]
pub struct DirectoryCache {
    listings: HashMap<String, Listing>,
    remote_listings: u64,
}

impl DirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of directories cached, absent ones included.
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Listing calls issued to the remote so far.
    pub fn remote_listings(&self) -> u64 {
        self.remote_listings
    }

    /// Find `file_name` among the files of directory `path`.
    ///
    /// # Returns
    /// - `Ok(Some(entry))` if the directory lists the file
    /// - `Ok(None)` if the directory or the file is absent
    /// - `Err` if the remote could not confirm either way
    pub async fn find_entry(
        &mut self,
        client: &LibraryClient,
        path: &str,
        file_name: &str,
    ) -> Result<Option<RemoteEntry>> {
        if !self.listings.contains_key(path) {
            self.remote_listings += 1;
            let listing = match client.list_directory(path).await {
                Ok(entries) => Listing::Present(entries),
                Err(e) if e.is_not_found() => {
                    debug!(path, "Directory absent, caching");
                    Listing::Absent
                }
                Err(e) => return Err(SyncError::from(e)),
            };
            self.listings.insert(path.to_string(), listing);
        }

        Ok(match self.listings.get(path) {
            Some(Listing::Present(entries)) => entries
                .iter()
                .find(|entry| !entry.is_directory() && entry.name == file_name)
                .cloned(),
            _ => None,
        })
    }
}
