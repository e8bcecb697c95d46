//! Virtual paths
//!
//! A catalog record's `file` field stands in for a remote location:
//!
//! ```text
//! <library-name>|<remote-directory-path>|<remote-file-name>
//! ```
//!
//! A literal `|` or `\` inside a segment is written as `\|` or `\\`, so any
//! name the remote produces survives the round trip.

use core_runtime::config::VIRTUAL_PATH_SEPARATOR;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SyncError};

const ESCAPE: char = '\\';

/// Remote directory path and file name decoded from a virtual path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLocation {
    pub path: String,
    pub file_name: String,
}

/// A decoded virtual path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualPath {
    pub library: String,
    pub path: String,
    pub file_name: String,
}

impl VirtualPath {
    pub fn new(
        library: impl Into<String>,
        path: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            library: library.into(),
            path: path.into(),
            file_name: file_name.into(),
        }
    }

    /// Parse a stored virtual path.
    ///
    /// # Errors
    ///
    /// Returns `MalformedVirtualPath` unless the value holds exactly three
    /// segments and every escape is complete.
    pub fn parse(value: &str) -> Result<Self> {
        let malformed = |reason: &str| SyncError::MalformedVirtualPath {
            path: value.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = vec![String::new()];
        let mut chars = value.chars();

        while let Some(c) = chars.next() {
            match c {
                ESCAPE => match chars.next() {
                    Some(escaped) => push_char(&mut segments, escaped),
                    None => return Err(malformed("dangling escape")),
                },
                VIRTUAL_PATH_SEPARATOR => segments.push(String::new()),
                other => push_char(&mut segments, other),
            }
        }

        if segments.len() != 3 {
            return Err(malformed(&format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        }

        let file_name = segments.pop().unwrap_or_default();
        let path = segments.pop().unwrap_or_default();
        let library = segments.pop().unwrap_or_default();

        if file_name.is_empty() {
            return Err(malformed("empty file name"));
        }

        Ok(Self {
            library,
            path,
            file_name,
        })
    }

    pub fn location(&self) -> RemoteLocation {
        RemoteLocation {
            path: self.path.clone(),
            file_name: self.file_name.clone(),
        }
    }

    pub fn into_location(self) -> RemoteLocation {
        RemoteLocation {
            path: self.path,
            file_name: self.file_name,
        }
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            escape(&self.library),
            escape(&self.path),
            escape(&self.file_name),
            sep = VIRTUAL_PATH_SEPARATOR
        )
    }
}

fn push_char(segments: &mut [String], c: char) {
    if let Some(last) = segments.last_mut() {
        last.push(c);
    }
}

fn escape(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for c in segment.chars() {
        if c == ESCAPE || c == VIRTUAL_PATH_SEPARATOR {
            escaped.push(ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Encode a remote location as the value stored in a record's `file` field.
pub fn encode(library: &str, path: &str, file_name: &str) -> String {
    VirtualPath::new(library, path, file_name).to_string()
}

/// Decode a stored `file` field, dropping the library segment.
pub fn decode(value: &str) -> Result<RemoteLocation> {
    VirtualPath::parse(value).map(VirtualPath::into_location)
}
