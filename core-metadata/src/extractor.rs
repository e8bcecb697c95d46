//! Audio Tag Reading
//!
//! Reads tag fields and audio properties with the `lofty` crate. Supports
//! ID3v2, Vorbis Comments, MP4 tags, FLAC, APE and RIFF INFO.
//!
//! The byte source is usually a bounded prefix of a remote file. Callers pass
//! the remote file's declared size, which is reported as the file size and
//! used to correct durations that `lofty` estimates from stream length.
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::{LoftyTagReader, TagReader};
//!
//! let reader = LoftyTagReader::new();
//! let tags = reader.read_tags(temp.path(), 4_000_000).await?;
//! println!("Title: {}", tags.title.unwrap_or_default());
//! ```

use async_trait::async_trait;
use core_library::models::TagFields;
use lofty::config::{ParseOptions, ParsingMode};
use lofty::file::{AudioFile, FileType, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{MetadataError, Result};

/// Tag-parsing collaborator
#[async_trait]
pub trait TagReader: Send + Sync {
    /// Read tags from the file at `path`, reporting `declared_size` as the
    /// file's size whatever the local byte count.
    async fn read_tags(&self, path: &Path, declared_size: u64) -> Result<TagFields>;
}

/// [`TagReader`] backed by `lofty`
///
/// Parsing runs on the blocking pool. Relaxed parsing tolerates the cut-off
/// final frame of a partial download.
#[derive(Debug, Clone, Copy)]
pub struct LoftyTagReader {
    parse_options: ParseOptions,
}

impl LoftyTagReader {
    pub fn new() -> Self {
        Self {
            parse_options: ParseOptions::new().parsing_mode(ParsingMode::Relaxed),
        }
    }

    pub fn with_options(parse_options: ParseOptions) -> Self {
        Self { parse_options }
    }

    fn read_blocking(
        parse_options: ParseOptions,
        path: &Path,
        declared_size: u64,
    ) -> Result<TagFields> {
        let local_size = std::fs::metadata(path)?.len();

        let tagged_file = Probe::open(path)
            .map_err(|e| MetadataError::ExtractionFailed(format!("Failed to open file: {}", e)))?
            .options(parse_options)
            .guess_file_type()?
            .read()
            .map_err(|e| MetadataError::ExtractionFailed(format!("Failed to parse file: {}", e)))?;

        let file_type = tagged_file.file_type();
        let mime = file_type_to_mime_type(file_type).ok_or_else(|| {
            MetadataError::UnsupportedFormat(format!("{:?}", file_type))
        })?;

        let properties = tagged_file.properties();
        let bitrate_kbps = properties.audio_bitrate().or(properties.overall_bitrate());
        let mut duration_secs = properties.duration().as_secs();

        if local_size < declared_size && estimates_from_stream_length(file_type) {
            if let Some(kbps) = bitrate_kbps.filter(|kbps| *kbps > 0) {
                let estimated = declared_size * 8 / (u64::from(kbps) * 1000);
                duration_secs = duration_secs.max(estimated);
            }
        }

        let mut tags = TagFields {
            duration_secs: Some(duration_secs),
            bitrate_kbps,
            sample_rate: properties.sample_rate(),
            channels: properties.channels(),
            mime: Some(mime.to_string()),
            size: declared_size,
            ..TagFields::default()
        };

        match tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
            Some(tag) => {
                tags.title = tag.title().map(|s| normalize_text(&s)).filter(|s| !s.is_empty());
                tags.artist = tag.artist().map(|s| normalize_text(&s)).filter(|s| !s.is_empty());
                tags.album = tag.album().map(|s| normalize_text(&s)).filter(|s| !s.is_empty());
                tags.album_artist = tag
                    .get_string(&ItemKey::AlbumArtist)
                    .map(normalize_text)
                    .filter(|s| !s.is_empty());
                tags.genre = tag.genre().map(|s| normalize_text(&s)).filter(|s| !s.is_empty());
                tags.year = tag.year().and_then(|y| i32::try_from(y).ok());
                tags.track_number = tag.track();
                tags.disc_number = tag.disk();
            }
            None => debug!(path = %path.display(), "No tags found"),
        }

        Ok(tags)
    }
}

impl Default for LoftyTagReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TagReader for LoftyTagReader {
    async fn read_tags(&self, path: &Path, declared_size: u64) -> Result<TagFields> {
        let parse_options = self.parse_options;
        let owned: PathBuf = path.to_path_buf();

        tokio::task::spawn_blocking(move || Self::read_blocking(parse_options, &owned, declared_size))
            .await
            .map_err(|e| {
                warn!(error = %e, "Tag reader task did not complete");
                MetadataError::TaskFailed(e.to_string())
            })?
    }
}

/// Formats whose duration `lofty` derives from the stream length when no
/// frame index is present.
fn estimates_from_stream_length(file_type: FileType) -> bool {
    matches!(file_type, FileType::Mpeg | FileType::Aac)
}

/// Normalize text metadata
///
/// - Trims leading/trailing whitespace
/// - Collapses consecutive whitespace to a single space
/// - Removes control characters
fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}

fn file_type_to_mime_type(file_type: FileType) -> Option<&'static str> {
    let mime = match file_type {
        FileType::Aac => "audio/aac",
        FileType::Aiff => "audio/aiff",
        FileType::Ape => "audio/ape",
        FileType::Flac => "audio/flac",
        FileType::Mpeg => "audio/mpeg",
        FileType::Mp4 => "audio/mp4",
        FileType::Mpc => "audio/musepack",
        FileType::Opus => "audio/opus",
        FileType::Vorbis => "audio/vorbis",
        FileType::Speex => "audio/speex",
        FileType::Wav => "audio/wav",
        FileType::WavPack => "audio/wavpack",
        _ => return None,
    };
    Some(mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Hello   World  "), "Hello World");
        assert_eq!(
            normalize_text("Title\nWith\tWhitespace"),
            "Title With Whitespace"
        );
        assert_eq!(normalize_text("Clean Text"), "Clean Text");
    }

    #[test]
    fn test_file_type_to_mime_type() {
        assert_eq!(file_type_to_mime_type(FileType::Mpeg), Some("audio/mpeg"));
        assert_eq!(file_type_to_mime_type(FileType::Flac), Some("audio/flac"));
        assert_eq!(file_type_to_mime_type(FileType::Opus), Some("audio/opus"));
    }

    #[test]
    fn test_stream_length_formats() {
        assert!(estimates_from_stream_length(FileType::Mpeg));
        assert!(!estimates_from_stream_length(FileType::Flac));
    }

    #[test]
    fn test_reader_default_matches_new() {
        assert_eq!(
            format!("{:?}", LoftyTagReader::new()),
            format!("{:?}", LoftyTagReader::default())
        );
    }
}
