//! Shared fakes for the reconciliation suites

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::ByteRange;
use bridge_traits::storage::{RemoteEntry, RemoteLibrary, RemoteLibraryApi};
use bytes::Bytes;
use core_library::models::TagFields;
use core_metadata::{MetadataError, Result as MetadataResult, TagReader};
use core_runtime::config::CatalogConfig;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

const URL_PREFIX: &str = "fake://";

#[derive(Default)]
struct Tree {
    listings: HashMap<String, Vec<RemoteEntry>>,
    contents: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    throttle_next: u32,
    listing_calls: Vec<String>,
    download_url_calls: u32,
}

/// A remote server holding one or more libraries; only `library` has content.
pub struct FakeRemote {
    libraries: Vec<RemoteLibrary>,
    tree: Mutex<Tree>,
}

impl FakeRemote {
    pub fn new(library: &str) -> Self {
        let mut tree = Tree::default();
        tree.listings.insert("/".to_string(), Vec::new());
        Self {
            libraries: vec![
                RemoteLibrary {
                    name: "Documents".to_string(),
                    id: "lib-docs".to_string(),
                },
                RemoteLibrary {
                    name: library.to_string(),
                    id: "lib-media".to_string(),
                },
            ],
            tree: Mutex::new(tree),
        }
    }

    fn ensure_dir(tree: &mut Tree, path: &str) {
        if tree.listings.contains_key(path) {
            return;
        }
        let trimmed = path.trim_end_matches('/');
        let (parent, name) = match trimmed.rfind('/') {
            Some(idx) => (&trimmed[..=idx], &trimmed[idx + 1..]),
            None => ("/", trimmed),
        };
        Self::ensure_dir(tree, parent);
        tree.listings
            .entry(parent.to_string())
            .or_default()
            .push(RemoteEntry::directory(name));
        tree.listings.insert(path.to_string(), Vec::new());
    }

    pub fn add_dir(&self, path: &str) {
        Self::ensure_dir(&mut self.tree.lock().unwrap(), path);
    }

    /// Add a file whose tags are `key=value` lines in `tags`.
    pub fn add_file(&self, path: &str, name: &str, size: u64, tags: &str) {
        let mut tree = self.tree.lock().unwrap();
        Self::ensure_dir(&mut tree, path);
        if let Some(listing) = tree.listings.get_mut(path) {
            listing.push(RemoteEntry::file(name, size));
        }
        tree.contents
            .insert(format!("{}{}", path, name), tags.as_bytes().to_vec());
    }

    pub fn retag(&self, path: &str, name: &str, tags: &str) {
        self.tree
            .lock()
            .unwrap()
            .contents
            .insert(format!("{}{}", path, name), tags.as_bytes().to_vec());
    }

    pub fn remove_file(&self, path: &str, name: &str) {
        let mut tree = self.tree.lock().unwrap();
        if let Some(listing) = tree.listings.get_mut(path) {
            listing.retain(|entry| entry.name != name);
        }
        tree.contents.remove(&format!("{}{}", path, name));
    }

    /// Delete a directory and everything below it.
    pub fn remove_dir(&self, path: &str) {
        let mut tree = self.tree.lock().unwrap();
        tree.listings.retain(|dir, _| !dir.starts_with(path));
        tree.contents.retain(|file, _| !file.starts_with(path));
        let trimmed = path.trim_end_matches('/');
        if let Some(idx) = trimmed.rfind('/') {
            let (parent, name) = (&trimmed[..=idx], &trimmed[idx + 1..]);
            if let Some(listing) = tree.listings.get_mut(parent) {
                listing.retain(|entry| entry.name != name);
            }
        }
    }

    pub fn fail_listing(&self, path: &str) {
        self.tree.lock().unwrap().failing.insert(path.to_string());
    }

    /// Throttle the next `calls` remote calls.
    pub fn throttle(&self, calls: u32) {
        self.tree.lock().unwrap().throttle_next = calls;
    }

    pub fn listing_calls(&self) -> Vec<String> {
        self.tree.lock().unwrap().listing_calls.clone()
    }

    pub fn download_url_calls(&self) -> u32 {
        self.tree.lock().unwrap().download_url_calls
    }

    fn throttled(tree: &mut Tree) -> BridgeResult<()> {
        if tree.throttle_next > 0 {
            tree.throttle_next -= 1;
            return Err(BridgeError::RateLimited {
                detail: "Request was throttled. Expected available in 2 seconds.".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteLibraryApi for FakeRemote {
    async fn authenticate(&self, username: &str, password: &str) -> BridgeResult<String> {
        if username == "user" && password == "secret" {
            Ok("token".to_string())
        } else {
            Err(BridgeError::Unauthorized("bad credentials".to_string()))
        }
    }

    async fn list_libraries(&self) -> BridgeResult<Vec<RemoteLibrary>> {
        Self::throttled(&mut self.tree.lock().unwrap())?;
        Ok(self.libraries.clone())
    }

    async fn list_directory(
        &self,
        _library: &RemoteLibrary,
        path: &str,
    ) -> BridgeResult<Vec<RemoteEntry>> {
        let mut tree = self.tree.lock().unwrap();
        Self::throttled(&mut tree)?;
        tree.listing_calls.push(path.to_string());
        if tree.failing.contains(path) {
            return Err(BridgeError::OperationFailed("502 Bad Gateway".to_string()));
        }
        tree.listings
            .get(path)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(path.to_string()))
    }

    async fn get_download_url(
        &self,
        _library: &RemoteLibrary,
        path: &str,
        file_name: &str,
    ) -> BridgeResult<String> {
        let mut tree = self.tree.lock().unwrap();
        Self::throttled(&mut tree)?;
        tree.download_url_calls += 1;
        let key = format!("{}{}", path, file_name);
        if tree.contents.contains_key(&key) {
            Ok(format!("{}{}", URL_PREFIX, key))
        } else {
            Err(BridgeError::NotFound(key))
        }
    }

    async fn fetch(&self, url: &str, range: Option<ByteRange>) -> BridgeResult<Bytes> {
        let mut tree = self.tree.lock().unwrap();
        Self::throttled(&mut tree)?;
        let key = url.trim_start_matches(URL_PREFIX);
        let content = tree
            .contents
            .get(key)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(key.to_string()))?;
        let end = range
            .map(|r| ((r.offset + r.length) as usize).min(content.len()))
            .unwrap_or(content.len());
        Ok(Bytes::copy_from_slice(&content[..end]))
    }
}

/// Reads `key=value` lines; content starting with `corrupt` fails to parse.
pub struct LineTagReader;

#[async_trait]
impl TagReader for LineTagReader {
    async fn read_tags(&self, path: &Path, declared_size: u64) -> MetadataResult<TagFields> {
        let content = std::fs::read_to_string(path)?;
        if content.starts_with("corrupt") {
            return Err(MetadataError::ExtractionFailed("no frame sync".to_string()));
        }

        let mut tags = TagFields {
            size: declared_size,
            ..TagFields::default()
        };
        for line in content.lines() {
            match line.split_once('=') {
                Some(("title", v)) => tags.title = Some(v.to_string()),
                Some(("artist", v)) => tags.artist = Some(v.to_string()),
                Some(("album", v)) => tags.album = Some(v.to_string()),
                Some(("year", v)) => tags.year = v.parse().ok(),
                _ => {}
            }
        }
        Ok(tags)
    }
}

pub fn config(library: &str) -> CatalogConfig {
    CatalogConfig::builder()
        .catalog_id(1)
        .server_uri("https://seafile.example.org/")
        .library_name(library)
        .api_token("token")
        .build()
        .unwrap()
}
