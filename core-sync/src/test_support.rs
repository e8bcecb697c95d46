//! In-memory remote library used by unit tests

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::ByteRange;
use bridge_traits::storage::{RemoteEntry, RemoteLibrary, RemoteLibraryApi};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

const URL_PREFIX: &str = "fake://";

#[derive(Default)]
struct State {
    listings: HashMap<String, Vec<RemoteEntry>>,
    contents: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    listing_calls: HashMap<String, u32>,
    fetched_ranges: Vec<Option<ByteRange>>,
}

/// A single library whose tree is built with [`FakeTree::add_file`].
pub(crate) struct FakeTree {
    library: RemoteLibrary,
    state: Mutex<State>,
}

impl FakeTree {
    pub(crate) fn new(library_name: &str) -> Self {
        let mut state = State::default();
        state.listings.insert("/".to_string(), Vec::new());
        Self {
            library: RemoteLibrary {
                name: library_name.to_string(),
                id: format!("lib-{}", library_name.to_lowercase()),
            },
            state: Mutex::new(state),
        }
    }

    /// Create directory `path` and its ancestors.
    pub(crate) fn add_dir(&self, path: &str) {
        let mut state = self.state.lock().unwrap();
        Self::ensure_dir(&mut state, path);
    }

    fn ensure_dir(state: &mut State, path: &str) {
        if state.listings.contains_key(path) {
            return;
        }
        let trimmed = path.trim_end_matches('/');
        let (parent, name) = match trimmed.rfind('/') {
            Some(idx) => (&trimmed[..=idx], &trimmed[idx + 1..]),
            None => ("/", trimmed),
        };
        Self::ensure_dir(state, parent);
        state
            .listings
            .entry(parent.to_string())
            .or_default()
            .push(RemoteEntry::directory(name));
        state.listings.insert(path.to_string(), Vec::new());
    }

    pub(crate) fn add_file(&self, path: &str, name: &str, size: u64) {
        self.add_file_with_content(path, name, size, Vec::new());
    }

    pub(crate) fn add_file_with_content(&self, path: &str, name: &str, size: u64, content: Vec<u8>) {
        let mut state = self.state.lock().unwrap();
        Self::ensure_dir(&mut state, path);
        if let Some(listing) = state.listings.get_mut(path) {
            listing.push(RemoteEntry::file(name, size));
        }
        state.contents.insert(format!("{}{}", path, name), content);
    }

    pub(crate) fn fail_listing(&self, path: &str) {
        self.state.lock().unwrap().failing.insert(path.to_string());
    }

    pub(crate) fn heal_listing(&self, path: &str) {
        self.state.lock().unwrap().failing.remove(path);
    }

    pub(crate) fn listing_calls(&self, path: &str) -> u32 {
        let state = self.state.lock().unwrap();
        state.listing_calls.get(path).copied().unwrap_or(0)
    }

    pub(crate) fn fetched_ranges(&self) -> Vec<Option<ByteRange>> {
        self.state.lock().unwrap().fetched_ranges.clone()
    }
}

#[async_trait]
impl RemoteLibraryApi for FakeTree {
    async fn authenticate(&self, _username: &str, _password: &str) -> Result<String> {
        Ok("token".to_string())
    }

    async fn list_libraries(&self) -> Result<Vec<RemoteLibrary>> {
        Ok(vec![self.library.clone()])
    }

    async fn list_directory(&self, _library: &RemoteLibrary, path: &str) -> Result<Vec<RemoteEntry>> {
        let mut state = self.state.lock().unwrap();
        *state.listing_calls.entry(path.to_string()).or_default() += 1;
        if state.failing.contains(path) {
            return Err(BridgeError::OperationFailed("listing failed".to_string()));
        }
        state
            .listings
            .get(path)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(path.to_string()))
    }

    async fn get_download_url(
        &self,
        _library: &RemoteLibrary,
        path: &str,
        file_name: &str,
    ) -> Result<String> {
        let key = format!("{}{}", path, file_name);
        let state = self.state.lock().unwrap();
        if state.contents.contains_key(&key) {
            Ok(format!("{}{}", URL_PREFIX, key))
        } else {
            Err(BridgeError::NotFound(key))
        }
    }

    async fn fetch(&self, url: &str, range: Option<ByteRange>) -> Result<Bytes> {
        let key = url.trim_start_matches(URL_PREFIX);
        let mut state = self.state.lock().unwrap();
        state.fetched_ranges.push(range);
        let content = state
            .contents
            .get(key)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(key.to_string()))?;
        let end = match range {
            Some(range) => ((range.offset + range.length) as usize).min(content.len()),
            None => content.len(),
        };
        let start = range.map(|r| r.offset as usize).unwrap_or(0).min(end);
        Ok(Bytes::copy_from_slice(&content[start..end]))
    }
}
