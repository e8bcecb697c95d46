//! Seafile Web API response types
//!
//! Data structures for deserializing the `api2` endpoints the catalog uses.

use bridge_traits::storage::{EntryKind, RemoteEntry, RemoteLibrary};
use serde::{Deserialize, Serialize};

/// `POST /api2/auth-token/` response
#[derive(Debug, Clone, Deserialize)]
pub struct AuthTokenResponse {
    pub token: String,
}

/// One element of `GET /api2/repos/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoEntry {
    /// Library (repo) ID
    pub id: String,

    pub name: String,

    /// `repo`, `srepo` (shared) or `grepo` (group)
    #[serde(rename = "type", default)]
    pub repo_type: Option<String>,

    #[serde(default)]
    pub encrypted: bool,
}

impl From<RepoEntry> for RemoteLibrary {
    fn from(repo: RepoEntry) -> Self {
        RemoteLibrary {
            name: repo.name,
            id: repo.id,
        }
    }
}

/// One element of `GET /api2/repos/{id}/dir/?p=...`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirEntry {
    /// `dir` or `file`
    #[serde(rename = "type")]
    pub entry_type: String,

    pub name: String,

    /// Size in bytes; absent for directories
    #[serde(default)]
    pub size: u64,

    /// Seafile object id
    #[serde(default)]
    pub id: Option<String>,

    /// Last modification (Unix seconds)
    #[serde(default)]
    pub mtime: Option<i64>,
}

impl DirEntry {
    /// Convert into a listing entry; unknown entry types yield `None`.
    pub fn into_remote_entry(self) -> Option<RemoteEntry> {
        let kind = match self.entry_type.as_str() {
            "dir" => EntryKind::Directory,
            "file" => EntryKind::File,
            _ => return None,
        };

        Some(RemoteEntry {
            name: self.name,
            size: if kind == EntryKind::File { self.size } else { 0 },
            kind,
        })
    }
}

/// Error body returned with 429 and most 4xx statuses
#[derive(Debug, Clone, Deserialize)]
pub struct DetailResponse {
    pub detail: String,
}

/// Error body returned by the auth endpoint on bad credentials
#[derive(Debug, Clone, Deserialize)]
pub struct NonFieldErrors {
    pub non_field_errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_entry_parsing() {
        let json = r#"[
            {"id": "0000", "type": "dir", "name": "A", "mtime": 1700000000},
            {"id": "abcd", "type": "file", "name": "song2.flac", "size": 800000, "mtime": 1700000001}
        ]"#;

        let entries: Vec<DirEntry> = serde_json::from_str(json).unwrap();
        let remote: Vec<RemoteEntry> = entries
            .into_iter()
            .filter_map(DirEntry::into_remote_entry)
            .collect();

        assert_eq!(remote[0], RemoteEntry::directory("A"));
        assert_eq!(remote[1], RemoteEntry::file("song2.flac", 800_000));
    }

    #[test]
    fn test_unknown_entry_type_is_dropped() {
        let entry = DirEntry {
            entry_type: "symlink".to_string(),
            name: "x".to_string(),
            size: 0,
            id: None,
            mtime: None,
        };
        assert!(entry.into_remote_entry().is_none());
    }

    #[test]
    fn test_repo_entry_parsing() {
        let json = r#"{"id": "f1e2", "name": "Music", "type": "repo", "encrypted": false, "size": 12}"#;
        let repo: RepoEntry = serde_json::from_str(json).unwrap();
        let library: RemoteLibrary = repo.into();
        assert_eq!(library.name, "Music");
        assert_eq!(library.id, "f1e2");
    }
}
