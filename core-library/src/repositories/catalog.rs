//! Catalog store trait and SQLite implementation

use crate::error::{LibraryError, Result};
use crate::models::{
    CatalogId, CatalogRecord, ExtractedMetadata, RecordId, RecordRow, RecordSummary, TagFields,
};
use async_trait::async_trait;
use bridge_traits::time::{Clock, SystemClock};
use sqlx::{query, query_as, SqlitePool};
use std::sync::Arc;
use tracing::debug;

/// Record store for one or more catalogs
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Find the record of `catalog_id` whose file field equals `file`
    ///
    /// # Returns
    /// - `Ok(Some(id))` if found
    /// - `Ok(None)` if not found
    async fn find_record_by_virtual_path(
        &self,
        catalog_id: CatalogId,
        file: &str,
    ) -> Result<Option<RecordId>>;

    /// Insert a new record
    ///
    /// # Errors
    /// Returns error if:
    /// - A record with the same file already exists in the catalog
    /// - Metadata validation fails
    async fn insert_record(&self, metadata: &ExtractedMetadata) -> Result<RecordId>;

    /// Replace the tag fields of `id` when they differ from `metadata`
    ///
    /// # Returns
    /// - `Ok(true)` if the record changed
    /// - `Ok(false)` if the stored fields already matched
    ///
    /// # Errors
    /// Returns `NotFound` if the record does not exist
    async fn update_record_if_changed(
        &self,
        id: RecordId,
        metadata: &ExtractedMetadata,
    ) -> Result<bool>;

    /// Delete a record
    ///
    /// # Returns
    /// - `Ok(true)` if the record was deleted
    /// - `Ok(false)` if it was already gone
    async fn delete_record(&self, id: RecordId) -> Result<bool>;

    /// Snapshot of every record in the catalog, ordered by id
    async fn list_records_for_catalog(&self, catalog_id: CatalogId) -> Result<Vec<RecordSummary>>;

    /// Fetch a full record
    async fn get_record(&self, id: RecordId) -> Result<Option<CatalogRecord>>;

    /// Number of records in the catalog
    async fn count_records(&self, catalog_id: CatalogId) -> Result<i64>;
}

pub(crate) fn validate(metadata: &ExtractedMetadata) -> Result<()> {
    metadata
        .validate()
        .map_err(|message| LibraryError::InvalidInput {
            field: "metadata".to_string(),
            message,
        })
}

fn to_i64<T: TryInto<i64>>(value: Option<T>) -> Option<i64> {
    value.and_then(|v| v.try_into().ok())
}

/// SQLite implementation of [`CatalogStore`]
pub struct SqliteCatalogStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteCatalogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            clock: Arc::new(SystemClock),
        }
    }

    /// Stamp `added_at`/`updated_at` from `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn fetch_row(&self, id: RecordId) -> Result<Option<RecordRow>> {
        let row = query_as::<_, RecordRow>("SELECT * FROM catalog_records WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn find_record_by_virtual_path(
        &self,
        catalog_id: CatalogId,
        file: &str,
    ) -> Result<Option<RecordId>> {
        let id: Option<(i64,)> =
            query_as("SELECT id FROM catalog_records WHERE catalog_id = ? AND file = ?")
                .bind(catalog_id)
                .bind(file)
                .fetch_optional(&self.pool)
                .await?;

        Ok(id.map(|(id,)| RecordId(id)))
    }

    async fn insert_record(&self, metadata: &ExtractedMetadata) -> Result<RecordId> {
        validate(metadata)?;

        let tags = &metadata.tags;
        let timestamp = self.clock.unix_timestamp();

        let result = query(
            r#"
            INSERT INTO catalog_records (
                catalog_id, file, title, artist, album, album_artist, genre,
                year, track_number, disc_number, duration_secs, bitrate_kbps,
                sample_rate, channels, mime, size, added_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(metadata.catalog_id)
        .bind(&metadata.file)
        .bind(&tags.title)
        .bind(&tags.artist)
        .bind(&tags.album)
        .bind(&tags.album_artist)
        .bind(&tags.genre)
        .bind(tags.year)
        .bind(to_i64(tags.track_number))
        .bind(to_i64(tags.disc_number))
        .bind(to_i64(tags.duration_secs))
        .bind(to_i64(tags.bitrate_kbps))
        .bind(to_i64(tags.sample_rate))
        .bind(to_i64(tags.channels))
        .bind(&tags.mime)
        .bind(to_i64(Some(tags.size)).unwrap_or(i64::MAX))
        .bind(timestamp)
        .bind(timestamp)
        .execute(&self.pool)
        .await?;

        let id = RecordId(result.last_insert_rowid());
        debug!(record_id = %id, file = %metadata.file, "Inserted catalog record");
        Ok(id)
    }

    async fn update_record_if_changed(
        &self,
        id: RecordId,
        metadata: &ExtractedMetadata,
    ) -> Result<bool> {
        validate(metadata)?;

        let row = self
            .fetch_row(id)
            .await?
            .ok_or_else(|| LibraryError::NotFound {
                entity_type: "CatalogRecord".to_string(),
                id: id.to_string(),
            })?;

        let tags: &TagFields = &metadata.tags;
        if row.tags() == *tags {
            return Ok(false);
        }

        query(
            r#"
            UPDATE catalog_records SET
                title = ?, artist = ?, album = ?, album_artist = ?, genre = ?,
                year = ?, track_number = ?, disc_number = ?, duration_secs = ?,
                bitrate_kbps = ?, sample_rate = ?, channels = ?, mime = ?, size = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&tags.title)
        .bind(&tags.artist)
        .bind(&tags.album)
        .bind(&tags.album_artist)
        .bind(&tags.genre)
        .bind(tags.year)
        .bind(to_i64(tags.track_number))
        .bind(to_i64(tags.disc_number))
        .bind(to_i64(tags.duration_secs))
        .bind(to_i64(tags.bitrate_kbps))
        .bind(to_i64(tags.sample_rate))
        .bind(to_i64(tags.channels))
        .bind(&tags.mime)
        .bind(to_i64(Some(tags.size)).unwrap_or(i64::MAX))
        .bind(self.clock.unix_timestamp())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        debug!(record_id = %id, "Updated catalog record");
        Ok(true)
    }

    async fn delete_record(&self, id: RecordId) -> Result<bool> {
        let result = query("DELETE FROM catalog_records WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_records_for_catalog(&self, catalog_id: CatalogId) -> Result<Vec<RecordSummary>> {
        let records = query_as::<_, RecordSummary>(
            "SELECT id, file, title FROM catalog_records WHERE catalog_id = ? ORDER BY id",
        )
        .bind(catalog_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn get_record(&self, id: RecordId) -> Result<Option<CatalogRecord>> {
        Ok(self.fetch_row(id).await?.map(CatalogRecord::from))
    }

    async fn count_records(&self, catalog_id: CatalogId) -> Result<i64> {
        let count: (i64,) = query_as("SELECT COUNT(*) FROM catalog_records WHERE catalog_id = ?")
            .bind(catalog_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
