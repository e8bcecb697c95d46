//! Metadata Processing Module
//!
//! Produces catalog-ready metadata for one remote file without downloading
//! all of it.
//!
//! ## Workflow
//!
//! 1. Obtain a short-lived download URL through the gateway
//! 2. Fetch a bounded prefix of the file (`header_size_bytes`)
//! 3. Write the bytes to a scoped temporary file
//! 4. Read tags, passing the remote file's declared size to the reader
//! 5. Attach the catalog id and virtual path
//!
//! The temporary file is removed when it goes out of scope, whichever step
//! fails.

use bridge_traits::http::ByteRange;
use bridge_traits::storage::RemoteEntry;
use core_library::models::{CatalogId, ExtractedMetadata};
use core_metadata::TagReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::session::LibraryClient;
use crate::virtual_path;

/// Years a record may carry; anything else in a tag is dropped.
const VALID_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// Extracts metadata from remote files for one catalog
pub struct MetadataProcessor {
    catalog_id: CatalogId,
    header_size_bytes: u64,
    tag_reader: Arc<dyn TagReader>,
    temp_dir: Option<PathBuf>,
}

impl MetadataProcessor {
    /// `header_size_bytes` of zero fetches whole files.
    pub fn new(catalog_id: CatalogId, header_size_bytes: u64, tag_reader: Arc<dyn TagReader>) -> Self {
        Self {
            catalog_id,
            header_size_bytes,
            tag_reader,
            temp_dir: None,
        }
    }

    /// Write temporary files under `dir` instead of the system default.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }

    /// Range to request for a file of `size` bytes; `None` fetches it whole.
    fn range_for(&self, size: u64) -> Option<ByteRange> {
        (self.header_size_bytes > 0 && size > self.header_size_bytes)
            .then(|| ByteRange::head(self.header_size_bytes))
    }

    /// Extract metadata for `entry`, found in directory `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the download URL or the ranged fetch fails, the
    /// temporary file cannot be written, or the tag reader rejects the bytes.
    #[instrument(skip(self, client, entry), fields(file = %entry.name))]
    pub async fn extract(
        &self,
        client: &LibraryClient,
        path: &str,
        entry: &RemoteEntry,
    ) -> Result<ExtractedMetadata> {
        let url = client.download_url(path, &entry.name).await?;
        let range = self.range_for(entry.size);
        let bytes = client.fetch(&url, range).await?;

        debug!(
            fetched = bytes.len(),
            declared = entry.size,
            "Fetched file prefix"
        );

        let temp = scoped_temp_file(&entry.name, self.temp_dir())?;
        tokio::fs::write(temp.path(), &bytes).await?;

        let mut tags = self.tag_reader.read_tags(temp.path(), entry.size).await?;
        drop(temp);

        if let Some(year) = tags.year.filter(|year| !VALID_YEARS.contains(year)) {
            warn!(file = %entry.name, year, "Dropping out-of-range year tag");
            tags.year = None;
        }
        if tags.title.is_none() {
            tags.title = file_stem(&entry.name);
        }
        tags.size = entry.size;

        Ok(ExtractedMetadata::new(
            self.catalog_id,
            virtual_path::encode(&client.library().name, path, &entry.name),
            tags,
        ))
    }
}

/// Temporary file carrying the extension of `file_name`, created in `dir`
/// or the system temporary directory.
pub(crate) fn scoped_temp_file(
    file_name: &str,
    dir: Option<&Path>,
) -> std::io::Result<tempfile::NamedTempFile> {
    let suffix = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    let mut builder = tempfile::Builder::new();
    builder.prefix("catalog-").suffix(&suffix);
    match dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
}

fn file_stem(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .filter(|stem| !stem.is_empty())
}
