//! Depth-first remote directory walk
//!
//! [`crawl`] yields every file below a root directory, paired with the path of
//! the directory containing it. Entries are visited in the order the remote
//! lists them, and a subdirectory is walked completely before the entries
//! that follow it in its parent's listing.

use bridge_traits::storage::RemoteEntry;
use futures::stream::{self, Stream};
use std::vec::IntoIter;
use tracing::{debug, trace};

use crate::error::{Result, SyncError};
use crate::session::LibraryClient;

/// A file found by the crawler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawledFile {
    pub entry: RemoteEntry,
    /// Slash-terminated path of the containing directory
    pub path: String,
}

struct Frame {
    path: String,
    entries: IntoIter<RemoteEntry>,
}

struct CrawlState<'a> {
    client: &'a LibraryClient,
    root: Option<String>,
    frames: Vec<Frame>,
}

impl CrawlState<'_> {
    /// List `path` and push it as the new innermost frame. A directory that
    /// vanished since its parent was listed contributes nothing.
    async fn descend(&mut self, path: String) -> Result<()> {
        match self.client.list_directory(&path).await {
            Ok(entries) => {
                trace!(path = %path, entries = entries.len(), "Listed directory");
                self.frames.push(Frame {
                    path,
                    entries: entries.into_iter(),
                });
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(path = %path, "Directory not found, nothing to crawl");
                Ok(())
            }
            Err(e) => Err(SyncError::from(e)),
        }
    }

    async fn next_file(&mut self) -> Option<Result<CrawledFile>> {
        if let Some(root) = self.root.take() {
            if let Err(e) = self.descend(root).await {
                return Some(Err(e));
            }
        }

        loop {
            let frame = self.frames.last_mut()?;

            let Some(entry) = frame.entries.next() else {
                self.frames.pop();
                continue;
            };

            if entry.is_directory() {
                let child = format!("{}{}/", frame.path, entry.name);
                if let Err(e) = self.descend(child).await {
                    return Some(Err(e));
                }
            } else {
                return Some(Ok(CrawledFile {
                    path: frame.path.clone(),
                    entry,
                }));
            }
        }
    }
}

/// Normalize a root path to the absolute, slash-terminated form listings use.
pub fn normalize_dir(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

/// Lazily walk the tree below `root`.
///
/// A listing failure other than not-found is yielded as an `Err` item and the
/// walk carries on with the remaining directories; the consumer decides
/// whether the error ends the run.
pub fn crawl<'a>(
    client: &'a LibraryClient,
    root: &str,
) -> impl Stream<Item = Result<CrawledFile>> + 'a {
    let state = CrawlState {
        client,
        root: Some(normalize_dir(root)),
        frames: Vec::new(),
    };

    stream::unfold(state, |mut state| async move {
        let item = state.next_file().await?;
        Some((item, state))
    })
}
