//! Domain models for the catalog record store

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Identifier of the catalog a record belongs to
pub type CatalogId = i64;

/// Unique identifier for a catalog record
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tag-derived fields of a media file
///
/// Two values compare equal exactly when a refresh would leave the stored
/// record unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFields {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    /// Duration in whole seconds
    pub duration_secs: Option<u64>,
    /// Bitrate in kbps
    pub bitrate_kbps: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
    pub mime: Option<String>,
    /// Size of the remote file in bytes
    pub size: u64,
}

/// Metadata extracted from one remote file, ready to be stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub catalog_id: CatalogId,
    /// Virtual path of the remote file
    pub file: String,
    pub tags: TagFields,
}

impl ExtractedMetadata {
    pub fn new(catalog_id: CatalogId, file: impl Into<String>, tags: TagFields) -> Self {
        Self {
            catalog_id,
            file: file.into(),
            tags,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.file.trim().is_empty() {
            return Err("Record file cannot be empty".to_string());
        }

        if let Some(year) = self.tags.year {
            if !(0..=9999).contains(&year) {
                return Err(format!("Record year {} is out of valid range", year));
            }
        }

        Ok(())
    }
}

/// A persisted catalog record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: RecordId,
    pub catalog_id: CatalogId,
    pub file: String,
    pub tags: TagFields,
    /// Unix seconds
    pub added_at: i64,
    /// Unix seconds
    pub updated_at: i64,
}

/// Lightweight view of a record used when walking a catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RecordSummary {
    pub id: RecordId,
    pub file: String,
    pub title: Option<String>,
}

/// Row shape of the `catalog_records` table
#[derive(Debug, Clone, FromRow)]
pub(crate) struct RecordRow {
    pub id: i64,
    pub catalog_id: i64,
    pub file: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub track_number: Option<i64>,
    pub disc_number: Option<i64>,
    pub duration_secs: Option<i64>,
    pub bitrate_kbps: Option<i64>,
    pub sample_rate: Option<i64>,
    pub channels: Option<i64>,
    pub mime: Option<String>,
    pub size: i64,
    pub added_at: i64,
    pub updated_at: i64,
}

impl RecordRow {
    pub(crate) fn tags(&self) -> TagFields {
        TagFields {
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
            album_artist: self.album_artist.clone(),
            genre: self.genre.clone(),
            year: self.year,
            track_number: self.track_number.and_then(|v| u32::try_from(v).ok()),
            disc_number: self.disc_number.and_then(|v| u32::try_from(v).ok()),
            duration_secs: self.duration_secs.and_then(|v| u64::try_from(v).ok()),
            bitrate_kbps: self.bitrate_kbps.and_then(|v| u32::try_from(v).ok()),
            sample_rate: self.sample_rate.and_then(|v| u32::try_from(v).ok()),
            channels: self.channels.and_then(|v| u8::try_from(v).ok()),
            mime: self.mime.clone(),
            size: u64::try_from(self.size).unwrap_or_default(),
        }
    }
}

impl From<RecordRow> for CatalogRecord {
    fn from(row: RecordRow) -> Self {
        let tags = row.tags();
        CatalogRecord {
            id: RecordId(row.id),
            catalog_id: row.catalog_id,
            file: row.file,
            tags,
            added_at: row.added_at,
            updated_at: row.updated_at,
        }
    }
}
